//! 档案容器打包/解包
//!
//! 容器是一个 zip：一个数据条目（backup-data.json）、一个清单条目
//! （manifest.txt）、若干 images/ 前缀的图片条目。解包按条目流式进行，
//! 同一时刻只保持一个打开的读取流。

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::backup::document::{ApiCredentialData, BackupDocument, BackupMetadata, UserProfileData};
use crate::backup::error::BackupError;
use crate::backup::image_cache::CachedImage;
use crate::backup::progress::{notify, stage, BackupProgress, ProgressSink};

/// 数据条目名
pub const DATA_ENTRY_NAME: &str = "backup-data.json";
/// 清单条目名
pub const MANIFEST_ENTRY_NAME: &str = "manifest.txt";
/// 图片条目的路径前缀
pub const IMAGE_ENTRY_PREFIX: &str = "images/";
/// 档案的内容类型
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// 从档案中提取的一张图片
#[derive(Debug, Clone)]
pub struct ArchiveImage {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub size: u64,
}

/// 解析并校验后的档案中间表示
#[derive(Debug, Clone)]
pub struct ParsedArchive {
    pub metadata: BackupMetadata,
    pub user: UserProfileData,
    pub document: BackupDocument,
    pub credentials: Vec<ApiCredentialData>,
    pub images: Vec<ArchiveImage>,
}

/// 将文档、清单与图片打包为 zip 字节流
///
/// 条目逐个追加并上报 packaging 进度；任何 I/O 或序列化失败都会
/// 中止整个构建。
pub fn write_archive(
    document: &BackupDocument,
    manifest: &str,
    images: &[CachedImage],
    progress: Option<&ProgressSink>,
) -> Result<Vec<u8>, BackupError> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| BackupError::BuildFailed(format!("序列化数据文档失败: {}", e)))?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let total = images.len() as u64 + 2;
    let mut appended = 0u64;

    zip.start_file(DATA_ENTRY_NAME, options)
        .map_err(|e| BackupError::BuildFailed(format!("写入数据条目失败: {}", e)))?;
    zip.write_all(json.as_bytes())
        .map_err(|e| BackupError::BuildFailed(format!("写入数据条目失败: {}", e)))?;
    appended += 1;
    notify(progress, BackupProgress::new(stage::PACKAGING, appended, total));

    zip.start_file(MANIFEST_ENTRY_NAME, options)
        .map_err(|e| BackupError::BuildFailed(format!("写入清单条目失败: {}", e)))?;
    zip.write_all(manifest.as_bytes())
        .map_err(|e| BackupError::BuildFailed(format!("写入清单条目失败: {}", e)))?;
    appended += 1;
    notify(progress, BackupProgress::new(stage::PACKAGING, appended, total));

    for image in images {
        zip.start_file(format!("{}{}", IMAGE_ENTRY_PREFIX, image.filename), options)
            .map_err(|e| {
                BackupError::BuildFailed(format!("写入图片条目 {} 失败: {}", image.filename, e))
            })?;
        zip.write_all(&image.bytes).map_err(|e| {
            BackupError::BuildFailed(format!("写入图片条目 {} 失败: {}", image.filename, e))
        })?;
        appended += 1;
        notify(progress, BackupProgress::new(stage::PACKAGING, appended, total));
    }

    let cursor = zip
        .finish()
        .map_err(|e| BackupError::BuildFailed(format!("完成档案写入失败: {}", e)))?;

    Ok(cursor.into_inner())
}

/// 解析上传的档案字节流，返回校验过的中间表示
///
/// 按路径分类条目：images/ 前缀的累积为图片，数据条目解析为文档，
/// 目录条目与其余条目一律跳过。遍历结束后 metadata、user 与文档
/// 三者缺一即拒绝，此时尚未发生任何数据库写入。
pub fn read_archive(data: &[u8]) -> Result<ParsedArchive, BackupError> {
    let mut zip = ZipArchive::new(Cursor::new(data))
        .map_err(|e| BackupError::CorruptArchive(format!("无法打开档案: {}", e)))?;

    let mut document: Option<BackupDocument> = None;
    let mut images = Vec::new();

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| BackupError::CorruptArchive(format!("读取条目 #{} 失败: {}", index, e)))?;

        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();

        if let Some(filename) = name.strip_prefix(IMAGE_ENTRY_PREFIX) {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| BackupError::CorruptArchive(format!("读取条目 {} 失败: {}", name, e)))?;
            images.push(ArchiveImage {
                filename: filename.to_string(),
                size: bytes.len() as u64,
                bytes,
            });
        } else if name == DATA_ENTRY_NAME {
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|e| BackupError::CorruptArchive(format!("读取条目 {} 失败: {}", name, e)))?;
            let parsed: BackupDocument = serde_json::from_str(&text)
                .map_err(|e| BackupError::InvalidArchive(format!("{}: {}", name, e)))?;
            document = Some(parsed);
        }
        // 清单与未知条目：跳过
    }

    let document =
        document.ok_or_else(|| BackupError::InvalidArchive("缺少数据条目".to_string()))?;
    let metadata = document
        .metadata
        .clone()
        .ok_or_else(|| BackupError::InvalidArchive("数据条目缺少 metadata 段".to_string()))?;
    let user = document
        .user
        .clone()
        .ok_or_else(|| BackupError::InvalidArchive("数据条目缺少 user 段".to_string()))?;
    let credentials = document.api_credentials.clone();

    Ok(ParsedArchive {
        metadata,
        user,
        document,
        credentials,
        images,
    })
}
