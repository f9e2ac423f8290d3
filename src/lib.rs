// 该文件是 Huoyan （火眼） 项目的一部分。
// src/lib.rs - 库主文件
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

pub mod frame;
pub mod input;
pub mod letterbox;
pub mod model;
pub mod output;
pub mod postprocess;
pub mod task;

use std::path::PathBuf;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 读取 URL 中的布尔查询参数，`?key`、`?key=true`、`?key=1` 均视为开启
pub(crate) fn query_flag(url: &url::Url, key: &str) -> bool {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.is_empty() || v == "true" || v == "1")
    .unwrap_or(false)
}

/// URL 路径按百分号编码解码后作为文件路径，空格与中文等字符在 URL 中均为转义形式
pub(crate) fn url_path(url: &url::Url) -> PathBuf {
  let decoded = urlencoding::decode_binary(url.path().as_bytes());
  PathBuf::from(String::from_utf8_lossy(&decoded).into_owned())
}

/// 读取 URL 中的查询参数值
pub(crate) fn query_value(url: &url::Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}
