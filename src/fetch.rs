// ==========================================
// 疫情通报采集系统 - 文档获取
// ==========================================
// 职责: 通过 HTTP 或本地文件取得页面与附件
// 红线: 获取阶段不做任何解析
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::extractor::SourceDocument;
use crate::importer::source_config::SourceConfig;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

// ==========================================
// DocumentFetcher - HTTP 获取
// ==========================================
pub struct DocumentFetcher {
    http_client: reqwest::Client,
}

impl DocumentFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> ImportResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ImportError::ConfigError {
                key: "http_client".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { http_client })
    }

    /// 获取页面文本（按响应声明的字符集解码）
    pub async fn fetch_text(&self, url: &str) -> ImportResult<String> {
        debug!(url = %url, "获取页面");
        let response = self.http_client.get(url).send().await?;
        let response = check_status(url, response)?;
        Ok(response.text().await?)
    }

    /// 获取二进制附件
    pub async fn fetch_bytes(&self, url: &str) -> ImportResult<Vec<u8>> {
        debug!(url = %url, "获取附件");
        let response = self.http_client.get(url).send().await?;
        let response = check_status(url, response)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// 获取一次运行所需的全部文档
    ///
    /// # 参数
    /// - page_url / attachment_url: 覆盖来源配置中的默认地址
    ///
    /// # 返回
    /// - Err(ConfigError): 来源没有默认地址且未指定
    #[instrument(skip(self, source), fields(state = %source.state))]
    pub async fn fetch_document(
        &self,
        source: &SourceConfig,
        page_url: Option<&str>,
        attachment_url: Option<&str>,
    ) -> ImportResult<SourceDocument> {
        let page_url = page_url
            .or(source.url.as_deref())
            .ok_or_else(|| missing_url(source, "url"))?;
        let page = self.fetch_text(page_url).await?;
        let mut document = SourceDocument::page(page);

        if source.strategy.needs_attachment() {
            let attachment_url = attachment_url
                .or(source.attachment_url.as_deref())
                .ok_or_else(|| missing_url(source, "attachment_url"))?;
            document = document.with_attachment(self.fetch_bytes(attachment_url).await?);
        }

        info!(
            page_url = %page_url,
            has_attachment = document.attachment.is_some(),
            "文档获取完成"
        );
        Ok(document)
    }
}

fn check_status(url: &str, response: reqwest::Response) -> ImportResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ImportError::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn missing_url(source: &SourceConfig, key: &str) -> ImportError {
    ImportError::ConfigError {
        key: key.to_string(),
        message: format!("{} 没有默认地址，需在命令行指定", source.state),
    }
}

// ==========================================
// 本地文件获取（离线重放 / 测试）
// ==========================================

/// 从本地文件读取文档
///
/// # 参数
/// - page: 页面文件（非 UTF-8 字节按替换字符解码）
/// - attachment: 附件文件
pub fn load_document(page: &Path, attachment: Option<&Path>) -> ImportResult<SourceDocument> {
    let bytes = std::fs::read(page)?;
    let mut document = SourceDocument::page(String::from_utf8_lossy(&bytes).into_owned());
    if let Some(path) = attachment {
        document = document.with_attachment(std::fs::read(path)?);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FederalState;
    use crate::importer::sources::source_for;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_document_from_files() {
        let mut page = NamedTempFile::new().unwrap();
        write!(page, "<p>Stand: 17.03.2020</p>").unwrap();
        let mut attachment = NamedTempFile::new().unwrap();
        attachment.write_all(&[0x50, 0x4b, 0x03, 0x04]).unwrap();

        let doc = load_document(page.path(), Some(attachment.path())).unwrap();
        assert!(doc.page.contains("17.03.2020"));
        assert_eq!(doc.attachment.as_deref(), Some(&[0x50, 0x4b, 0x03, 0x04][..]));
    }

    #[test]
    fn test_load_document_missing_file_is_fetch_failure() {
        let err = load_document(Path::new("/nonexistent/page.html"), None).unwrap_err();
        assert_eq!(err.kind(), crate::importer::error::FailureKind::Fetch);
    }

    #[tokio::test]
    async fn test_fetch_document_requires_url() {
        let fetcher = DocumentFetcher::new("corona-ingest-test", 5).unwrap();
        let source = source_for(FederalState::Hh);
        assert!(source.url.is_none());

        let err = fetcher.fetch_document(&source, None, None).await.unwrap_err();
        assert!(matches!(err, ImportError::ConfigError { .. }));
    }
}
