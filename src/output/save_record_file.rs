// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/save_record_file.rs - 仅保存标注文件
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

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  model::DetectResult,
  output::{Render, record::Record},
  query_flag, url_path,
};

#[derive(Error, Debug)]
pub enum SaveRecordFileError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 不绘制图像，只写出 YOLO 格式标注
pub struct SaveRecordFileOutput {
  path: PathBuf,
  record: Record,
}

impl FromUrlWithScheme for SaveRecordFileOutput {
  const SCHEME: &'static str = "txt";
}

impl FromUrl for SaveRecordFileOutput {
  type Error = SaveRecordFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveRecordFileError::SchemeMismatch);
    }

    Ok(SaveRecordFileOutput {
      path: url_path(uri),
      record: Record {
        with_conf: query_flag(uri, "conf"),
      },
    })
  }
}

impl Render<RgbNhwcFrame, DetectResult> for SaveRecordFileOutput {
  type Error = SaveRecordFileError;

  fn render_result(&self, _frame: &RgbNhwcFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    self.record.record(result, &self.path)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_conf_flag() {
    let output = SaveRecordFileOutput::from_url(&Url::parse("txt:///tmp/labels.txt?conf").unwrap()).unwrap();
    assert!(output.record.with_conf);
    assert_eq!(output.path, PathBuf::from("/tmp/labels.txt"));
  }

  #[test]
  fn decodes_escaped_path() {
    let output = SaveRecordFileOutput::from_url(&Url::parse("txt:///tmp/标注 文件.txt").unwrap()).unwrap();
    assert_eq!(output.path, PathBuf::from("/tmp/标注 文件.txt"));
  }
}
