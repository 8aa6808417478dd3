//! URL 列表 JSON 结构体
//!
//! 媒体表的截图/剧照列存储为 JSON 数组（TEXT 列），
//! 通过此包装类型在实体层以 `Vec<String>` 形式读写。

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// 存储在 TEXT 列中的 URL 数组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, FromJsonQueryResult)]
pub struct UrlList(pub Vec<String>);

impl UrlList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for UrlList {
    fn from(urls: Vec<String>) -> Self {
        Self(urls)
    }
}
