// ==========================================
// 疫情通报采集系统 - 16 个联邦州的数据源配置表
// ==========================================
// 每个来源的锚点、时间格式候选、非数据行、改写规则都在这里
// 版面变化时只改本表，不改管线
// ==========================================

use crate::domain::types::{FederalState, ObservationKind, RegionKind};
use crate::importer::name_canonicalizer::{
    exact, remove, replace, strip_prefix, NameCanonicalizer, RewriteRule, RuleAction,
    RuleCondition,
};
use crate::importer::source_config::{
    ColumnRef, CompositeRegion, DateTimePattern, DelimitedConfig, ExtractionStrategy,
    HeaderAnchor, HtmlTableConfig, LabelCell, LookupOrder, ProseConfig, RegionResolution,
    Sentinel, SentinelAction, SourceConfig, TimestampAnchor, WorkbookConfig,
};

/// 全部来源配置（按 FederalState::ALL 顺序）
pub fn all_sources() -> Vec<SourceConfig> {
    FederalState::ALL.iter().map(|s| source_for(*s)).collect()
}

/// 单个联邦州的来源配置
pub fn source_for(state: FederalState) -> SourceConfig {
    match state {
        FederalState::Bw => baden_wuerttemberg(),
        FederalState::By => bayern(),
        FederalState::Be => berlin(),
        FederalState::Bb => brandenburg(),
        FederalState::Hb => bremen(),
        FederalState::Hh => hamburg(),
        FederalState::He => hessen(),
        FederalState::Mv => mecklenburg_vorpommern(),
        FederalState::Ni => niedersachsen(),
        FederalState::Nw => nordrhein_westfalen(),
        FederalState::Rp => rheinland_pfalz(),
        FederalState::Sl => saarland(),
        FederalState::Sn => sachsen(),
        FederalState::St => sachsen_anhalt(),
        FederalState::Sh => schleswig_holstein(),
        FederalState::Th => thueringen(),
    }
}

/// 某州的规范化引擎
pub fn canonicalizer_for(state: FederalState) -> NameCanonicalizer {
    NameCanonicalizer::new(source_for(state).rules)
}

// ==========================================
// 构造辅助
// ==========================================

fn text(s: &str) -> String {
    s.to_string()
}

fn placeholders(markers: &[&str]) -> Vec<String> {
    markers.iter().map(|m| m.to_string()).collect()
}

fn when(condition: RuleCondition, actions: Vec<RuleAction>) -> RewriteRule {
    RewriteRule::when(condition, actions)
}

fn starts_with(prefix: &str) -> RuleCondition {
    RuleCondition::StartsWith(text(prefix))
}

fn table(
    table_selector: &str,
    header: (&str, usize, &str),
    row_selector: &str,
    label: LabelCell,
    count_column: ColumnRef,
) -> HtmlTableConfig {
    HtmlTableConfig {
        table_selector: text(table_selector),
        header: HeaderAnchor {
            selector: text(header.0),
            index: header.1,
            text: text(header.2),
        },
        row_selector: text(row_selector),
        skip_rows: 0,
        label,
        expected_cells: Vec::new(),
        count_column,
        death_column: None,
    }
}

fn county_first() -> RegionResolution {
    RegionResolution {
        lookup_order: LookupOrder::CountyFirst,
        composites: Vec::new(),
    }
}

// ==========================================
// 表格型来源
// ==========================================

fn baden_wuerttemberg() -> SourceConfig {
    SourceConfig {
        state: FederalState::Bw,
        url: Some(text("https://sozialministerium.baden-wuerttemberg.de/de/gesundheit-pflege/gesundheitsschutz/infektionsschutz-hygiene/informationen-zu-coronavirus/lage-in-baden-wuerttemberg/")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "figcaption",
            vec![DateTimePattern::datetime("Stand: %d. %B %Y, %H:%M Uhr")],
        )
        .capture(r"\((Stand: .+? Uhr)\)"),
        strategy: ExtractionStrategy::Workbook(WorkbookConfig {
            infected_sheet: text("Infizierte Coronavirus in BW"),
            deaths_sheet: Some(text("Todesfälle Coronavirus in BW")),
            anchor_prefix: text("Stadt-/Landkreis"),
            label_column: 0,
            count_column: 1,
            date_column: 1,
        }),
        sentinels: vec![Sentinel::exact("Summe", SentinelAction::TotalAndStop)],
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::None,
        rules: vec![RewriteRule::always(vec![
            exact("Stuttgart", "Stuttgart (Stadt)"),
            replace(" (Stadtkreis)", " (Stadt)"),
        ])],
        resolution: county_first(),
    }
}

fn bayern() -> SourceConfig {
    let mut layout = table(
        "div.row.abstand_unten table",
        ("tr th", 0, "Landkreis/Stadt"),
        "tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.expected_cells = vec![8];
    layout.death_column = Some(ColumnRef::Index(6));

    SourceConfig {
        state: FederalState::By,
        url: Some(text("https://www.lgl.bayern.de/gesundheit/infektionsschutz/infektionskrankheiten_a_z/coronavirus/karte_coronavirus/index.htm")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "p.bildunterschrift",
            vec![DateTimePattern::datetime("%d.%m.%Y, %H:%M Uhr")],
        )
        .containing("Stand")
        .capture(r"(\d{1,2}\.\d{1,2}\.\d{4}, \d{1,2}:\d{2} Uhr)"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("Gesamtergebnis", SentinelAction::TotalAndStop)],
        placeholders: placeholders(&["-"]),
        default_kind: ObservationKind::None,
        rules: vec![RewriteRule::always(vec![
            replace("Bad Tölz", "Bad Tölz-Wolfratshausen"),
            replace("Dillingen a.d. Donau", "Dillingen an der Donau"),
            replace("Mühldorf a.Inn", "Mühldorf am Inn"),
            replace("Neumarkt i.d.Opf.", "Neumarkt in der Oberpfalz"),
            replace("Neustadt a.d. Aisch-Bad Windsheim", "Neustadt an der Aisch-Bad Windsheim"),
            replace("Neustadt a.d. Waldnaab", "Neustadt an der Waldnaab"),
            replace("Pfaffenhofen a.d.Ilm", "Pfaffenhofen an der Ilm"),
            replace("Wunsiedel i.Fichtelgebirge", "Wunsiedel im Fichtelgebirge"),
            replace(" Stadt", " (Stadt)"),
            replace("Kempten", "Kempten (Allgäu)"),
            replace("Weiden", "Weiden in der Oberpfalz"),
        ])],
        resolution: county_first(),
    }
}

fn brandenburg() -> SourceConfig {
    let mut layout = table(
        "table",
        ("tbody tr:first-child td", 0, "Landkreis/kreisfreie Stadt"),
        "tbody tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.skip_rows = 1;

    SourceConfig {
        state: FederalState::Bb,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "table tbody tr:first-child td p strong",
            vec![DateTimePattern::datetime("Stand: %d.%m., %H:%M Uhr").without_year()],
        )
        .containing("Stand:"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("Brandenburg gesamt", SentinelAction::Total)],
        placeholders: placeholders(&["---"]),
        default_kind: ObservationKind::None,
        rules: vec![RewriteRule::always(vec![replace(
            "Brandenburg a. d. Havel",
            "Brandenburg an der Havel",
        )])],
        resolution: county_first(),
    }
}

fn bremen() -> SourceConfig {
    let mut layout = table(
        "table",
        ("tr th", 0, "Bestätigte Fälle insgesamt"),
        "tr",
        LabelCell::Th,
        ColumnRef::Index(0),
    );
    layout.skip_rows = 1;

    SourceConfig {
        state: FederalState::Hb,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new("span.article_time", vec![DateTimePattern::date_at("%d.%m.%Y", 12)]),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("Land Bremen", SentinelAction::Total)],
        placeholders: placeholders(&["-"]),
        default_kind: ObservationKind::City,
        rules: vec![RewriteRule::always(vec![strip_prefix("Stadtgemeinde ")])],
        resolution: RegionResolution {
            lookup_order: LookupOrder::CityFirst,
            composites: Vec::new(),
        },
    }
}

fn hessen() -> SourceConfig {
    let mut layout = table(
        "table",
        ("thead th", 0, "Kreis/Stadt"),
        "tbody tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.death_column = Some(ColumnRef::Index(2));

    SourceConfig {
        state: FederalState::He,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "p",
            vec![DateTimePattern::datetime("%d.%m.%Y, %H:%M Uhr")],
        )
        .containing("Stand:")
        .capture(r"Stand: (\d{1,2}\.\d{1,2}\.\d{4}, \d{1,2}:\d{2} Uhr)"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("Gesamt", SentinelAction::Total)],
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::None,
        rules: vec![
            RewriteRule::always(vec![
                strip_prefix("LK "),
                exact("SK Offenbach", "Offenbach am Main (Stadt)"),
            ]),
            when(
                starts_with("SK "),
                vec![strip_prefix("SK "), RuleAction::AppendCitySuffix],
            ),
        ],
        resolution: county_first(),
    }
}

fn mecklenburg_vorpommern() -> SourceConfig {
    let mut layout = table(
        "table",
        ("tr td", 0, "Landkreis / kreisfreie Stadt"),
        "tr",
        LabelCell::Td(0),
        ColumnRef::Last,
    );
    layout.skip_rows = 2;

    SourceConfig {
        state: FederalState::Mv,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "table tr td p strong",
            vec![
                DateTimePattern::datetime("Stand %d.%m. %H:%M Uhr").without_year(),
                DateTimePattern::datetime("Stand %d.%m. %H:%M").without_year(),
            ],
        )
        .containing("Stand"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("SUMME", SentinelAction::Total)],
        placeholders: placeholders(&["-"]),
        default_kind: ObservationKind::None,
        rules: vec![
            RewriteRule::always(vec![
                exact("Hansestadt Rostock", "Rostock (Stadt)"),
                exact("Schwerin", "Schwerin (Stadt)"),
            ]),
            when(
                starts_with("Landkreis "),
                vec![
                    strip_prefix("Landkreis "),
                    RuleAction::SetKind(ObservationKind::County),
                ],
            ),
        ],
        resolution: county_first(),
    }
}

fn nordrhein_westfalen() -> SourceConfig {
    let mut layout = table(
        "table",
        ("thead th", 0, "Landkreis/ kreisfreie Stadt"),
        "tbody tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.expected_cells = vec![4];
    layout.death_column = Some(ColumnRef::Index(2));

    SourceConfig {
        state: FederalState::Nw,
        url: Some(text("https://www.mags.nrw/coronavirus-fallzahlen-nrw")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "div.field-item p",
            vec![
                DateTimePattern::datetime("%d. %B %Y, %H:%M Uhr."),
                DateTimePattern::date_at("%d. %B %Y.", 12),
            ],
        )
        .containing("Stand:")
        .capture(r"Stand: (.+)$"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("Gesamt", SentinelAction::Total)],
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::None,
        rules: vec![
            RewriteRule::always(vec![remove("*")]),
            when(
                RuleCondition::Equals(text("Aachen & Städteregion Aachen")),
                vec![RuleAction::SetKind(ObservationKind::District)],
            ),
            when(
                RuleCondition::ContainsIgnoreCase(text("kreis")),
                vec![
                    remove(" (Kreis)"),
                    RuleAction::SetKind(ObservationKind::County),
                ],
            ),
            when(
                RuleCondition::All(vec![
                    RuleCondition::KindIsNot(ObservationKind::County),
                    RuleCondition::KindIsNot(ObservationKind::District),
                ]),
                vec![
                    replace("Mülheim / Ruhr", "Mülheim an der Ruhr"),
                    RuleAction::AppendCitySuffix,
                ],
            ),
        ],
        resolution: RegionResolution {
            lookup_order: LookupOrder::CountyFirst,
            composites: vec![CompositeRegion {
                label: text("Aachen & Städteregion Aachen"),
                parts: vec![
                    (RegionKind::City, text("Aachen")),
                    (RegionKind::County, text("Aachen")),
                ],
            }],
        },
    }
}

fn rheinland_pfalz() -> SourceConfig {
    let mut layout = table(
        "table",
        ("tbody tr:first-child td", 0, "Landkreis"),
        "tbody tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.skip_rows = 1;
    layout.death_column = Some(ColumnRef::Index(2));

    SourceConfig {
        state: FederalState::Rp,
        url: Some(text("https://msagd.rlp.de/de/unsere-themen/gesundheit-und-pflege/gesundheitliche-versorgung/oeffentlicher-gesundheitsdienst-hygiene-und-infektionsschutz/infektionsschutz/informationen-zum-coronavirus-sars-cov-2/")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "table tbody tr:last-child td",
            vec![DateTimePattern::datetime("Stand: %d.%m.%Y; %H Uhr")],
        )
        .containing("Stand:"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![
            Sentinel::exact("Stadt", SentinelAction::Section(ObservationKind::City)),
            Sentinel::prefix("Stand:", SentinelAction::Stop),
        ],
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::County,
        rules: vec![
            when(
                RuleCondition::KindIs(ObservationKind::City),
                vec![
                    strip_prefix("KS "),
                    replace("Frankenthal", "Frankenthal (Pfalz)"),
                    replace("Landau i.d. Pfalz", "Landau in der Pfalz"),
                    replace("Landau i.d.Pfalz", "Landau in der Pfalz"),
                    replace("Ludwigshafen", "Ludwigshafen am Rhein"),
                    replace("Neustadt Weinst.", "Neustadt an der Weinstraße"),
                    RuleAction::AppendCitySuffix,
                ],
            ),
            when(
                RuleCondition::KindIs(ObservationKind::County),
                vec![
                    strip_prefix("LK "),
                    replace("Altenkirchen", "Altenkirchen (Westerwald)"),
                    replace("Bitburg-Prüm", "Eifelkreis Bitburg-Prüm"),
                    replace("Rhein-Hunsrück", "Rhein-Hunsrück-Kreis"),
                    replace("Südliche Weinstr.", "Südliche Weinstraße"),
                ],
            ),
        ],
        resolution: county_first(),
    }
}

fn sachsen() -> SourceConfig {
    let mut layout = table(
        "table",
        ("thead th", 0, "Kreisfreie Stadt / Landkreis"),
        "tbody tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.expected_cells = vec![2, 4];

    SourceConfig {
        state: FederalState::Sn,
        url: Some(text("https://www.coronavirus.sachsen.de/infektionsfaelle-in-sachsen-4151.html")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "div.text-col p",
            vec![DateTimePattern::datetime("Stand: %d. %B %Y, %H:%M Uhr")],
        )
        .containing("Stand:")
        .capture(r"(Stand: .+ Uhr)"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact(
            "Gesamtzahl der Infektionen",
            SentinelAction::Total,
        )],
        placeholders: placeholders(&["-"]),
        default_kind: ObservationKind::None,
        rules: vec![
            when(
                starts_with("Landkreis "),
                vec![
                    strip_prefix("Landkreis "),
                    RuleAction::SetKind(ObservationKind::County),
                ],
            ),
            when(
                starts_with("Landeshauptstadt "),
                vec![strip_prefix("Landeshauptstadt "), RuleAction::AppendCitySuffix],
            ),
            when(
                starts_with("Stadt "),
                vec![strip_prefix("Stadt "), RuleAction::AppendCitySuffix],
            ),
        ],
        resolution: county_first(),
    }
}

fn sachsen_anhalt() -> SourceConfig {
    let mut layout = table(
        "table",
        ("tbody tr td", 0, "Melde-Landkreis"),
        "tbody tr",
        LabelCell::Td(0),
        ColumnRef::Index(1),
    );
    layout.expected_cells = vec![4];
    layout.death_column = Some(ColumnRef::Index(3));

    SourceConfig {
        state: FederalState::St,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "p span",
            vec![
                DateTimePattern::datetime("Stand:%d.%B%Y,%H:%MUhr"),
                DateTimePattern::datetime("Stand:%d.%B,%H:%MUhr").without_year(),
            ],
        )
        .containing("Stand:")
        .capture(r"\((Stand:.+?Uhr)")
        .compact(),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![
            Sentinel::exact("Melde-Landkreis", SentinelAction::Skip),
            Sentinel::exact("Gesamtergebnis", SentinelAction::Total),
        ],
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::None,
        rules: vec![
            when(
                starts_with("SK "),
                vec![
                    exact("SK Dessau", "SK Dessau-Roßlau"),
                    replace("Halle", "Halle (Saale)"),
                    strip_prefix("SK "),
                    RuleAction::AppendCitySuffix,
                ],
            ),
            when(
                starts_with("LK "),
                vec![
                    replace("Anhalt Bitterfeld", "Anhalt-Bitterfeld"),
                    strip_prefix("LK "),
                    RuleAction::SetKind(ObservationKind::County),
                ],
            ),
        ],
        resolution: county_first(),
    }
}

fn schleswig_holstein() -> SourceConfig {
    SourceConfig {
        state: FederalState::Sh,
        url: Some(text("https://www.schleswig-holstein.de/DE/Landesregierung/I/Presse/_documents/Corona-Liste_Kreise.html")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "table thead th",
            vec![DateTimePattern::date_at("Stand %d.%m.", 9).without_year()],
        )
        .last()
        .capture(r"^(Stand \d{1,2}\.\d{1,2}\.)"),
        strategy: ExtractionStrategy::HtmlTable(table(
            "table",
            ("thead th", 0, "Kreis / kreisfreie Stadt"),
            "tbody tr",
            LabelCell::Td(0),
            ColumnRef::Last,
        )),
        sentinels: vec![Sentinel::exact("SUMME", SentinelAction::Total)],
        placeholders: placeholders(&["-"]),
        default_kind: ObservationKind::None,
        rules: Vec::new(),
        resolution: county_first(),
    }
}

fn thueringen() -> SourceConfig {
    let mut layout = table(
        "table.table.table-striped",
        ("thead th", 2, "aktueller"),
        "tbody tr",
        LabelCell::Th,
        ColumnRef::Index(1),
    );
    layout.expected_cells = vec![7];
    layout.death_column = Some(ColumnRef::Index(6));

    SourceConfig {
        state: FederalState::Th,
        url: Some(text("https://www.landesregierung-thueringen.de/corona-bulletin/")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "section.th-box h2, section.th-box h3",
            vec![
                DateTimePattern::datetime("(Stand: %d. %B %Y, %H Uhr)"),
                DateTimePattern::date_at("(Stand: %d. %B %Y)", 12),
            ],
        )
        .containing("Stand: ")
        .capture(r"(\(Stand: .+?\))"),
        strategy: ExtractionStrategy::HtmlTable(layout),
        sentinels: vec![Sentinel::exact("Summe", SentinelAction::Total)],
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::None,
        rules: Vec::new(),
        resolution: RegionResolution {
            lookup_order: LookupOrder::CityFirst,
            composites: Vec::new(),
        },
    }
}

// ==========================================
// 分隔文本型来源
// ==========================================

fn niedersachsen() -> SourceConfig {
    SourceConfig {
        state: FederalState::Ni,
        url: Some(text("https://www.apps.nlga.niedersachsen.de/corona/iframe.php")),
        attachment_url: Some(text("https://www.apps.nlga.niedersachsen.de/corona/download.php?csv-file")),
        timestamp: TimestampAnchor::new(
            "p b",
            vec![DateTimePattern::datetime("Datenstand: %d.%m.%Y %H:%M Uhr")],
        )
        .containing("Datenstand"),
        strategy: ExtractionStrategy::Delimited(DelimitedConfig {
            delimiter: b';',
            label_column: text("Landkreis"),
            count_column: text("bestätigte Fälle"),
            death_column: Some(text("verstorbene Fälle")),
        }),
        sentinels: Vec::new(),
        placeholders: placeholders(&["-", ""]),
        default_kind: ObservationKind::None,
        rules: vec![
            RewriteRule::always(vec![
                replace("Nienburg (Weser)", "Nienburg/Weser"),
                strip_prefix("LK "),
            ]),
            when(
                RuleCondition::Equals(text("Region Hannover")),
                vec![RuleAction::SetKind(ObservationKind::District)],
            ),
            when(
                starts_with("SK "),
                vec![strip_prefix("SK "), RuleAction::AppendCitySuffix],
            ),
        ],
        resolution: RegionResolution {
            lookup_order: LookupOrder::CountyFirst,
            composites: vec![CompositeRegion {
                label: text("Region Hannover"),
                parts: vec![
                    (RegionKind::City, text("Hannover")),
                    (RegionKind::County, text("Hannover")),
                ],
            }],
        },
    }
}

// ==========================================
// 正文型来源（仅州级）
// ==========================================

fn berlin() -> SourceConfig {
    SourceConfig {
        state: FederalState::Be,
        url: Some(text("https://www.berlin.de/sen/gpg/service/presse/2020/")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "div.date",
            vec![DateTimePattern::datetime("%d.%m.%Y %H:%M Uhr")],
        ),
        strategy: ExtractionStrategy::Prose(ProseConfig {
            item_selector: Some(text("ul.list-autoteaser li")),
            text_selector: text("div.text a"),
            count_patterns: vec![text(r"([\d\.]+) bestätigte Fälle")],
            death_patterns: Vec::new(),
        }),
        sentinels: Vec::new(),
        placeholders: Vec::new(),
        default_kind: ObservationKind::None,
        rules: Vec::new(),
        resolution: county_first(),
    }
}

fn hamburg() -> SourceConfig {
    SourceConfig {
        state: FederalState::Hh,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "p.article-date",
            vec![
                DateTimePattern::datetime("%d. %B %Y %H:%M Uhr"),
                DateTimePattern::date_at("%d. %B %Y", 13),
            ],
        ),
        strategy: ExtractionStrategy::Prose(ProseConfig {
            item_selector: None,
            text_selector: text("div.richtext p"),
            count_patterns: vec![
                text(r"insgesamt ([\d\.]+) angestiegen"),
                text(r"(?:insgesamt|liegt nun|damit) bei +([\d\.]+)"),
            ],
            death_patterns: vec![
                text(r"([\d\.]+) Personen mit einer COVID-19-Infektion verstorben"),
                text(r"([\d\.]+) +Personen die COVID-19-Infektion als todesursächlich"),
            ],
        }),
        sentinels: Vec::new(),
        placeholders: Vec::new(),
        default_kind: ObservationKind::None,
        rules: Vec::new(),
        resolution: county_first(),
    }
}

fn saarland() -> SourceConfig {
    SourceConfig {
        state: FederalState::Sl,
        url: Some(text("https://corona.saarland.de/DE/service/chronologie-corona/chronologie-corona_node.html")),
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "main.main.row div p strong",
            vec![
                DateTimePattern::datetime("%d.%m.%Y - %H:%M Uhr"),
                DateTimePattern::datetime("%d.%m.%Y - %H Uhr"),
            ],
        ),
        strategy: ExtractionStrategy::Prose(ProseConfig {
            item_selector: None,
            text_selector: text("main.main.row div p"),
            count_patterns: vec![text(r"infizierten Personen beträgt landesweit ([\d\.]+)")],
            death_patterns: vec![text(r"Zahl der Verstorbenen: ([\d\.]+)")],
        }),
        sentinels: Vec::new(),
        placeholders: Vec::new(),
        default_kind: ObservationKind::None,
        rules: Vec::new(),
        resolution: county_first(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::name_canonicalizer::CanonicalName;

    /// 校验完整映射表，并验证输出再次规范化后不变
    fn assert_table(state: FederalState, kind: ObservationKind, cases: &[(&str, &str)]) {
        let engine = canonicalizer_for(state);
        for (raw, expected) in cases {
            let once = engine.canonicalize(raw, kind);
            assert_eq!(&once.name, expected, "[{}] '{}'", state, raw);

            let twice = engine.canonicalize(&once.name, once.kind);
            assert_eq!(twice, once, "[{}] 规则链未收敛: '{}'", state, raw);
        }
    }

    #[test]
    fn test_all_sources_cover_every_state() {
        let sources = all_sources();
        assert_eq!(sources.len(), 16);
        for (source, state) in sources.iter().zip(FederalState::ALL.iter()) {
            assert_eq!(source.state, *state);
            assert!(!source.timestamp.patterns.is_empty());
        }
    }

    #[test]
    fn test_bw_rename_table() {
        assert_table(
            FederalState::Bw,
            ObservationKind::None,
            &[
                ("Stuttgart", "Stuttgart (Stadt)"),
                ("Heilbronn (Stadtkreis)", "Heilbronn (Stadt)"),
                ("Freiburg im Breisgau (Stadtkreis)", "Freiburg im Breisgau (Stadt)"),
                ("Heilbronn", "Heilbronn"),
                ("Böblingen", "Böblingen"),
            ],
        );
    }

    #[test]
    fn test_by_rename_table() {
        assert_table(
            FederalState::By,
            ObservationKind::None,
            &[
                ("Bad Tölz", "Bad Tölz-Wolfratshausen"),
                ("Bad Tölz-Wolfratshausen", "Bad Tölz-Wolfratshausen"),
                ("Dillingen a.d. Donau", "Dillingen an der Donau"),
                ("Mühldorf a.Inn", "Mühldorf am Inn"),
                ("Neumarkt i.d.Opf.", "Neumarkt in der Oberpfalz"),
                ("Neustadt a.d. Aisch-Bad Windsheim", "Neustadt an der Aisch-Bad Windsheim"),
                ("Neustadt a.d. Waldnaab", "Neustadt an der Waldnaab"),
                ("Pfaffenhofen a.d.Ilm", "Pfaffenhofen an der Ilm"),
                ("Wunsiedel i.Fichtelgebirge", "Wunsiedel im Fichtelgebirge"),
                ("München Stadt", "München (Stadt)"),
                ("München", "München"),
                ("Kempten Stadt", "Kempten (Allgäu) (Stadt)"),
                ("Weiden Stadt", "Weiden in der Oberpfalz (Stadt)"),
            ],
        );
    }

    #[test]
    fn test_bb_rename_table() {
        assert_table(
            FederalState::Bb,
            ObservationKind::None,
            &[
                ("Brandenburg a. d. Havel", "Brandenburg an der Havel"),
                ("Potsdam", "Potsdam"),
                ("Oberhavel", "Oberhavel"),
            ],
        );
    }

    #[test]
    fn test_hb_rename_table() {
        assert_table(
            FederalState::Hb,
            ObservationKind::City,
            &[
                ("Stadtgemeinde Bremen", "Bremen"),
                ("Stadtgemeinde Bremerhaven", "Bremerhaven"),
            ],
        );
    }

    #[test]
    fn test_he_rename_table() {
        assert_table(
            FederalState::He,
            ObservationKind::None,
            &[
                ("LK Offenbach", "Offenbach"),
                ("SK Offenbach", "Offenbach am Main (Stadt)"),
                ("SK Kassel", "Kassel (Stadt)"),
                ("LK Kassel", "Kassel"),
                ("SK Frankfurt am Main", "Frankfurt am Main (Stadt)"),
            ],
        );
    }

    #[test]
    fn test_mv_rename_table() {
        assert_table(
            FederalState::Mv,
            ObservationKind::None,
            &[
                ("Hansestadt Rostock", "Rostock (Stadt)"),
                ("Schwerin", "Schwerin (Stadt)"),
                ("Landkreis Rostock", "Rostock"),
                ("Vorpommern-Greifswald", "Vorpommern-Greifswald"),
            ],
        );
    }

    #[test]
    fn test_ni_rename_table() {
        assert_table(
            FederalState::Ni,
            ObservationKind::None,
            &[
                ("LK Nienburg (Weser)", "Nienburg/Weser"),
                ("LK Göttingen", "Göttingen"),
                ("SK Osnabrück", "Osnabrück (Stadt)"),
                ("LK Osnabrück", "Osnabrück"),
                ("Region Hannover", "Region Hannover"),
            ],
        );

        let result = canonicalizer_for(FederalState::Ni)
            .canonicalize("Region Hannover", ObservationKind::None);
        assert_eq!(result.kind, ObservationKind::District);
    }

    #[test]
    fn test_nw_rename_table() {
        assert_table(
            FederalState::Nw,
            ObservationKind::None,
            &[
                ("Borken (Kreis)", "Borken"),
                ("Rhein-Kreis Neuss", "Rhein-Kreis Neuss"),
                ("Ennepe-Ruhr-Kreis", "Ennepe-Ruhr-Kreis"),
                ("Düsseldorf", "Düsseldorf (Stadt)"),
                ("Köln*", "Köln (Stadt)"),
                ("Mülheim / Ruhr", "Mülheim an der Ruhr (Stadt)"),
                ("Aachen & Städteregion Aachen", "Aachen & Städteregion Aachen"),
            ],
        );
    }

    #[test]
    fn test_rp_rename_table() {
        assert_table(
            FederalState::Rp,
            ObservationKind::County,
            &[
                ("LK Altenkirchen", "Altenkirchen (Westerwald)"),
                ("LK Bitburg-Prüm", "Eifelkreis Bitburg-Prüm"),
                ("LK Rhein-Hunsrück", "Rhein-Hunsrück-Kreis"),
                ("LK Südliche Weinstr.", "Südliche Weinstraße"),
                ("LK Mainz-Bingen", "Mainz-Bingen"),
                ("LK Kaiserslautern", "Kaiserslautern"),
            ],
        );
        assert_table(
            FederalState::Rp,
            ObservationKind::City,
            &[
                ("KS Frankenthal", "Frankenthal (Pfalz) (Stadt)"),
                ("KS Landau i.d. Pfalz", "Landau in der Pfalz (Stadt)"),
                ("KS Landau i.d.Pfalz", "Landau in der Pfalz (Stadt)"),
                ("KS Ludwigshafen", "Ludwigshafen am Rhein (Stadt)"),
                ("KS Neustadt Weinst.", "Neustadt an der Weinstraße (Stadt)"),
                ("KS Kaiserslautern", "Kaiserslautern (Stadt)"),
                ("KS Mainz", "Mainz (Stadt)"),
            ],
        );
    }

    #[test]
    fn test_sn_rename_table() {
        assert_table(
            FederalState::Sn,
            ObservationKind::None,
            &[
                ("Landkreis Leipzig", "Leipzig"),
                ("Stadt Leipzig", "Leipzig (Stadt)"),
                ("Landeshauptstadt Dresden", "Dresden (Stadt)"),
                ("Stadt Chemnitz", "Chemnitz (Stadt)"),
                ("Erzgebirgskreis", "Erzgebirgskreis"),
            ],
        );
    }

    #[test]
    fn test_st_rename_table() {
        assert_table(
            FederalState::St,
            ObservationKind::None,
            &[
                ("SK Dessau", "Dessau-Roßlau (Stadt)"),
                ("SK Dessau-Roßlau", "Dessau-Roßlau (Stadt)"),
                ("SK Halle", "Halle (Saale) (Stadt)"),
                ("SK Magdeburg", "Magdeburg (Stadt)"),
                ("LK Anhalt Bitterfeld", "Anhalt-Bitterfeld"),
                ("LK Harz", "Harz"),
            ],
        );
    }

    #[test]
    fn test_sources_without_rules_pass_through() {
        for state in [FederalState::Sh, FederalState::Th] {
            assert_table(
                state,
                ObservationKind::None,
                &[("Nordfriesland", "Nordfriesland"), ("Erfurt", "Erfurt")],
            );
        }
    }

    #[test]
    fn test_canonical_kind_for_counties() {
        let result = canonicalizer_for(FederalState::Nw)
            .canonicalize("Borken (Kreis)", ObservationKind::None);
        assert_eq!(
            result,
            CanonicalName {
                name: "Borken".to_string(),
                kind: ObservationKind::County,
            }
        );
    }
}
