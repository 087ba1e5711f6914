// ==========================================
// 疫情通报采集系统 - 命令行入口
// ==========================================
// 一次调用处理一份通报（或一项维护操作）
// 退出码: 成功 0；抓取 / 结构 / 存储失败 1
// ==========================================

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use corona_ingest::config::AppConfig;
use corona_ingest::domain::record::{format_timestamp, parse_timestamp};
use corona_ingest::fetch::{load_document, DocumentFetcher};
use corona_ingest::importer::{all_sources, source_for, BulletinImporter, ImportOptions};
use corona_ingest::maintenance::{load_lookup, LabelReport, RenameOutcome};
use corona_ingest::notify::notifier_from_config;
use corona_ingest::{
    catalog, logging, BulletinImporterImpl, FederalState, MaintenanceService, RecordStore,
    SqliteRecordStore,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "corona-ingest")]
#[command(author, version, about = "联邦州疫情通报采集与归一化")]
struct Cli {
    /// 配置文件（JSON）
    #[arg(short, long, env = "CORONA_INGEST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// JSON 行格式日志
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 采集一个联邦州的当期通报
    Ingest {
        /// 联邦州简称（BW, BY, ...）或德文全称
        state: FederalState,

        /// 页面地址（覆盖默认地址）
        #[arg(long)]
        url: Option<String>,

        /// 附件地址（覆盖默认地址）
        #[arg(long)]
        attachment_url: Option<String>,

        /// 从本地文件读取页面
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// 从本地文件读取附件
        #[arg(long, requires = "file")]
        attachment_file: Option<PathBuf>,

        /// 时间戳不含年份时使用的年份
        #[arg(long)]
        year: Option<i32>,

        /// 只解析与计算，不写记录
        #[arg(long)]
        dry_run: bool,

        /// 州合计不一致时中止
        #[arg(long)]
        strict_totals: bool,
    },

    /// 列出全部来源配置
    Sources,

    /// 重命名单个区域
    Rename {
        old: String,
        new: String,

        /// 限定联邦州
        #[arg(long)]
        state: Option<FederalState>,
    },

    /// 按现行规范化规则重命名全部已存储区域
    RenameAll,

    /// 按 JSON 对照表（旧名 → 新名）重命名
    RenameLookup {
        file: PathBuf,

        #[arg(long)]
        state: Option<FederalState>,
    },

    /// 重算州级记录的发病率
    RecalcRates {
        /// 起始时间（YYYY-MM-DD 或 YYYY-MM-DDTHH:MM:SSZ）
        #[arg(long)]
        since: String,
    },

    /// 最近的运行记录
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// 人口参考数据
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// 由 CSV 构建 population.json
    Build {
        #[arg(long)]
        states: PathBuf,
        #[arg(long)]
        counties: PathBuf,
        #[arg(long)]
        cities: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.json_log);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{:#}", e).replace('\n', " ");
            error!(error = %message, "运行失败");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest {
            state,
            url,
            attachment_url,
            file,
            attachment_file,
            year,
            dry_run,
            strict_totals,
        } => {
            let source = source_for(state);
            let importer = BulletinImporterImpl::new(
                open_store(&config)?,
                Arc::new(config.load_catalog()?),
                Arc::from(notifier_from_config(config.pushover.as_ref(), &config.user_agent)?),
            );

            let fetched = match file {
                Some(path) => load_document(&path, attachment_file.as_deref()),
                None => match DocumentFetcher::new(&config.user_agent, config.timeout_secs) {
                    Ok(fetcher) => {
                        fetcher
                            .fetch_document(&source, url.as_deref(), attachment_url.as_deref())
                            .await
                    }
                    Err(e) => Err(e),
                },
            };
            let document = match fetched {
                Ok(document) => document,
                Err(e) => {
                    importer.report_failure(state, &e).await;
                    return Err(e.into());
                }
            };

            let options = ImportOptions {
                dry_run,
                strict_totals: strict_totals || config.strict_totals,
                reference_year: year,
            };
            let outcome = importer.import(&source, &document, options).await?;

            for record in &outcome.records {
                println!("{}", serde_json::to_string(record)?);
            }
            info!(
                run_id = %outcome.run.run_id,
                records = outcome.records.len(),
                anomalies = outcome.anomalies.len(),
                "通报入库完成"
            );
        }

        Command::Sources => {
            for source in all_sources() {
                println!(
                    "{}\t{}\t{}\t{}",
                    source.state,
                    source.state.name(),
                    source.strategy.family(),
                    source.url.as_deref().unwrap_or("-")
                );
            }
        }

        Command::Rename { old, new, state } => {
            let service = maintenance_service(&config)?;
            let moved = service.rename_region(state, &old, &new).await?;
            println!("{} -> {}: {}", old, new, moved);
        }

        Command::RenameAll => {
            let service = maintenance_service(&config)?;
            print_reports(&service.rename_with_rules().await?);
        }

        Command::RenameLookup { file, state } => {
            let lookup = load_lookup(&file)?;
            let service = maintenance_service(&config)?;
            print_reports(&service.rename_from_lookup(&lookup, state).await?);
        }

        Command::RecalcRates { since } => {
            let since = parse_since(&since)?;
            let service = maintenance_service(&config)?;
            let written = service.recalculate_rates(since).await?;
            println!("{}", written);
        }

        Command::Runs { limit } => {
            let store = open_store(&config)?;
            for run in store.recent_runs(limit).await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    format_timestamp(&run.started_at),
                    run.state,
                    run.status.as_str(),
                    run.record_count,
                    run.bulletin_timestamp
                        .as_ref()
                        .map(format_timestamp)
                        .unwrap_or_else(|| "-".to_string()),
                    run.message.as_deref().unwrap_or("")
                );
            }
        }

        Command::Catalog {
            command:
                CatalogCommand::Build {
                    states,
                    counties,
                    cities,
                    output,
                },
        } => {
            let count = catalog::build_population_file(&states, &counties, &cities, &output)?;
            println!("{}: {}", output.display(), count);
        }
    }

    Ok(())
}

fn open_store(config: &AppConfig) -> Result<SqliteRecordStore> {
    let db_path = config.resolved_db_path();
    info!(db_path = %db_path, "使用数据库");
    SqliteRecordStore::new(&db_path).with_context(|| format!("无法打开数据库 {}", db_path))
}

fn maintenance_service(config: &AppConfig) -> Result<MaintenanceService<SqliteRecordStore>> {
    Ok(MaintenanceService::new(
        open_store(config)?,
        Arc::new(config.load_catalog()?),
    ))
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = parse_timestamp(raw) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow!("无法解析起始时间: {}", raw))
}

fn print_reports(reports: &[LabelReport]) {
    for report in reports {
        let outcome = match &report.outcome {
            RenameOutcome::Renamed { records } => format!("RENAMED {}", records),
            RenameOutcome::Unchanged => "SKIP unchanged".to_string(),
            RenameOutcome::AlreadyCanonical => "SKIP canonical".to_string(),
            RenameOutcome::SurroundingSpace => "FAIL surrounding whitespace".to_string(),
            RenameOutcome::UnknownState => "FAIL unknown state".to_string(),
            RenameOutcome::Failed(message) => format!("FAIL {}", message),
        };
        println!(
            "{}\t'{}' -> '{}'\t{}",
            report.state, report.old_name, report.new_name, outcome
        );
    }
}
