//! Supervised fine-tuning dataset export.
//!
//! Each manifest row (image file name plus its label string) becomes one
//! conversation record: the taxonomy system prompt, a user turn holding an
//! object-store image reference and the user prompt, and the expected
//! assistant answer `{"result":"<labels>"}`. Records are written as JSONL.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::table::Table;
use crate::config::{ColumnsConfig, DatasetConfig};
use crate::error::DatasetError;
use crate::output::{OutputFormat, OutputWriter};
use crate::taxonomy::{render_prompt, Taxonomy};

/// Conversation schema identifier expected by the fine-tuning service.
pub const SCHEMA_VERSION: &str = "bedrock-conversation-2024";

/// Fixed parts of every record.
#[derive(Debug, Clone)]
pub struct SftOptions {
    pub bucket: String,
    pub prefix: String,
    pub bucket_owner: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl SftOptions {
    /// Options from config, with the system turn rendered from `taxonomy` in
    /// the configured prompt style.
    pub fn from_config(config: &DatasetConfig, taxonomy: &Taxonomy, max_labels: usize) -> Self {
        Self {
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            bucket_owner: config.bucket_owner.clone(),
            system_prompt: render_prompt(taxonomy, max_labels, config.prompt_style),
            user_prompt: config.user_prompt.clone(),
        }
    }

    /// Object URI for `filename`.
    pub fn image_uri(&self, filename: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("s3://{}/{}", self.bucket, filename)
        } else {
            format!("s3://{}/{}/{}", self.bucket, prefix, filename)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SftRecord<'a> {
    schema_version: &'static str,
    system: [TextBlock<'a>; 1],
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Image { image: ImageBlock },
    Text(TextBlock<'a>),
    Owned { text: String },
}

#[derive(Debug, Serialize)]
struct ImageBlock {
    format: &'static str,
    source: ImageBlockSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageBlockSource {
    s3_location: S3Location,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct S3Location {
    uri: String,
    bucket_owner: String,
}

/// Image format for the record, or `None` when the file type is not accepted.
///
/// Only JPEG (`.jpg`/`.jpeg`, case-insensitive) is exported.
pub fn sft_image_format(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
        Some("jpeg")
    } else {
        None
    }
}

/// Build one record, or `None` when the image format is not exportable.
pub fn build_record<'a>(flag: &str, filename: &str, options: &'a SftOptions) -> Option<SftRecord<'a>> {
    let format = sft_image_format(filename)?;
    let answer = serde_json::json!({ "result": flag }).to_string();

    Some(SftRecord {
        schema_version: SCHEMA_VERSION,
        system: [TextBlock {
            text: &options.system_prompt,
        }],
        messages: [
            Message {
                role: "user",
                content: vec![
                    Content::Image {
                        image: ImageBlock {
                            format,
                            source: ImageBlockSource {
                                s3_location: S3Location {
                                    uri: options.image_uri(filename),
                                    bucket_owner: options.bucket_owner.clone(),
                                },
                            },
                        },
                    },
                    Content::Text(TextBlock {
                        text: &options.user_prompt,
                    }),
                ],
            },
            Message {
                role: "assistant",
                content: vec![Content::Owned { text: answer }],
            },
        ],
    })
}

/// Counts from an export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SftSummary {
    pub rows: usize,
    pub written: usize,
    /// Rows whose file type is not exportable
    pub skipped_format: usize,
    /// Rows whose image is absent from the local images root
    pub skipped_missing: usize,
    /// Rows with an empty file name
    pub skipped_blank: usize,
}

/// Stream records for every row of `table` into `writer`.
///
/// When `images_root` is given, rows whose file does not exist under it are
/// skipped.
pub fn write_sft_dataset<W: Write>(
    table: &Table,
    filename_col: &str,
    flag_col: &str,
    options: &SftOptions,
    images_root: Option<&Path>,
    writer: &mut OutputWriter<W>,
) -> Result<SftSummary, DatasetError> {
    let filename_idx = table.column(filename_col)?;
    let flag_idx = table.column(flag_col)?;
    let io_err = |source| DatasetError::Io {
        path: table.path().to_path_buf(),
        source,
    };

    let mut summary = SftSummary::default();
    for row in table.rows() {
        summary.rows += 1;
        let filename = row.get(filename_idx).trim();
        if filename.is_empty() {
            summary.skipped_blank += 1;
            continue;
        }
        if let Some(root) = images_root {
            if !root.join(filename).is_file() {
                tracing::warn!("Skipping {}: not found under {:?}", filename, root);
                summary.skipped_missing += 1;
                continue;
            }
        }

        match build_record(row.get(flag_idx).trim(), filename, options) {
            Some(record) => {
                writer.write(&record).map_err(io_err)?;
                summary.written += 1;
            }
            None => {
                tracing::warn!("Skipping {}: only JPEG images are exported", filename);
                summary.skipped_format += 1;
            }
        }
    }

    tracing::info!(
        "Exported {} of {} rows ({} wrong format, {} missing)",
        summary.written,
        summary.rows,
        summary.skipped_format,
        summary.skipped_missing
    );
    Ok(summary)
}

/// Export the manifest at `input` to a JSONL file at `output`.
pub fn export_sft(
    input: &Path,
    output: &Path,
    columns: &ColumnsConfig,
    options: &SftOptions,
    images_root: Option<&Path>,
) -> crate::Result<SftSummary> {
    let table = Table::read(input)?;
    let mut writer = OutputWriter::create(output, OutputFormat::JsonLines)?;
    let summary = write_sft_dataset(
        &table,
        &columns.filename,
        &columns.flag,
        options,
        images_root,
        &mut writer,
    )?;
    writer.finish()?;
    Ok(summary)
}

/// Result of checking manifest images against a local root.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageCheck {
    pub checked: usize,
    pub missing: Vec<String>,
}

/// Report every `filename_col` entry that does not exist under `images_root`.
pub fn check_images(
    table: &Table,
    filename_col: &str,
    images_root: &Path,
) -> Result<ImageCheck, DatasetError> {
    let filename_idx = table.column(filename_col)?;
    let mut check = ImageCheck::default();

    for row in table.rows() {
        let filename = row.get(filename_idx).trim();
        if filename.is_empty() {
            continue;
        }
        check.checked += 1;
        if !images_root.join(filename).is_file() {
            tracing::debug!("{} is missing", filename);
            check.missing.push(filename.to_string());
        }
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TagcheckError;

    fn options() -> SftOptions {
        SftOptions {
            bucket: "train-bucket".to_string(),
            prefix: "tagging/imgs/".to_string(),
            bucket_owner: "123456789012".to_string(),
            system_prompt: "SYSTEM".to_string(),
            user_prompt: "Please classify".to_string(),
        }
    }

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes(), Path::new("train.csv")).unwrap()
    }

    #[test]
    fn test_options_from_config_use_precise_prompt() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let config = DatasetConfig {
            bucket: "b".to_string(),
            ..DatasetConfig::default()
        };
        let opts = SftOptions::from_config(&config, &taxonomy, 5);
        assert!(opts.system_prompt.contains("Maximum of 5 categories"));
        assert!(!opts.system_prompt.contains("COMPLIANCE_GUIDELINES"));
        assert_eq!(opts.image_uri("a.jpg"), "s3://b/imgs/a.jpg");
    }

    #[test]
    fn test_record_shape() {
        let opts = options();
        let record = build_record("刀具,爪刀", "a1.jpg", &opts).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(value["system"][0]["text"], "SYSTEM");
        let user = &value["messages"][0];
        assert_eq!(user["role"], "user");
        assert_eq!(user["content"][0]["image"]["format"], "jpeg");
        assert_eq!(
            user["content"][0]["image"]["source"]["s3Location"]["uri"],
            "s3://train-bucket/tagging/imgs/a1.jpg"
        );
        assert_eq!(
            user["content"][0]["image"]["source"]["s3Location"]["bucketOwner"],
            "123456789012"
        );
        assert_eq!(user["content"][1]["text"], "Please classify");
        assert_eq!(value["messages"][1]["role"], "assistant");
        assert_eq!(
            value["messages"][1]["content"][0]["text"],
            "{\"result\":\"刀具,爪刀\"}"
        );
    }

    #[test]
    fn test_answer_is_json_escaped() {
        let opts = options();
        let record = build_record("a\"b", "x.jpeg", &opts).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        let answer = value["messages"][1]["content"][0]["text"].as_str().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(answer).unwrap();
        assert_eq!(parsed["result"], "a\"b");
    }

    #[test]
    fn test_only_jpeg_exported() {
        assert_eq!(sft_image_format("a.jpg"), Some("jpeg"));
        assert_eq!(sft_image_format("a.JPEG"), Some("jpeg"));
        assert_eq!(sft_image_format("a.png"), None);
        assert_eq!(sft_image_format("noext"), None);
        assert!(build_record("x", "a.webp", &options()).is_none());
    }

    #[test]
    fn test_uri_without_prefix() {
        let opts = SftOptions {
            prefix: String::new(),
            ..options()
        };
        assert_eq!(opts.image_uri("a.jpg"), "s3://train-bucket/a.jpg");
    }

    #[test]
    fn test_write_dataset_counts_and_jsonl() {
        let t = table("filename,flag\na.jpg,刀具\nb.png,充电宝\n,x\nc.jpeg,无\n");
        let opts = options();
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines, false);

        let summary = write_sft_dataset(&t, "filename", "flag", &opts, None, &mut writer).unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.skipped_format, 1);
        assert_eq!(summary.skipped_blank, 1);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("刀具"));
        assert!(!lines[0].contains("\\u"));
    }

    #[test]
    fn test_write_dataset_skips_missing_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"jpg").unwrap();
        let t = table("filename,flag\na.jpg,A\nb.jpg,B\n");
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines, false);

        let summary =
            write_sft_dataset(&t, "filename", "flag", &options(), Some(dir.path()), &mut writer)
                .unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped_missing, 1);
    }

    #[test]
    fn test_check_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"jpg").unwrap();
        let t = table("filename,flag\na.jpg,A\nb.jpg,B\n ,C\n");

        let check = check_images(&t, "filename", dir.path()).unwrap();
        assert_eq!(check.checked, 2);
        assert_eq!(check.missing, vec!["b.jpg"]);
    }

    #[test]
    fn test_missing_flag_column() {
        let t = table("filename,label\na.jpg,A\n");
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines, false);
        let err = write_sft_dataset(&t, "filename", "flag", &options(), None, &mut writer)
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }

    #[test]
    fn test_export_sft_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("train.csv");
        let output = dir.path().join("train.jsonl");
        std::fs::write(&input, "filename,flag\na.jpg,刀具\nb.jpg,无\n").unwrap();

        let summary =
            export_sft(&input, &output, &ColumnsConfig::default(), &options(), None).unwrap();

        assert_eq!(summary.written, 2);
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written.lines().count(), 2);
    }

    #[test]
    fn test_export_sft_reports_dataset_errors() {
        let err = export_sft(
            Path::new("/nonexistent/train.csv"),
            Path::new("/nonexistent/train.jsonl"),
            &ColumnsConfig::default(),
            &options(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TagcheckError::Dataset(DatasetError::Io { .. })));
    }
}
