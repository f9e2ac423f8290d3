// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  model::DetectResult,
  output::{Render, draw::Draw, record::Record},
  query_flag, url_path,
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
  record: Option<Record>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let record = query_flag(uri, "txt").then(|| Record {
      with_conf: query_flag(uri, "conf"),
    });

    Ok(SaveImageFileOutput {
      path: url_path(uri),
      draw: Draw::default(),
      record,
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      draw: Draw::default(),
      record: None,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn with_record(mut self, record: Option<Record>) -> Self {
    self.record = record;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// 标注文件与图像同名，扩展名为 `.txt`
  pub fn record_path(&self) -> PathBuf {
    self.path.with_extension("txt")
  }

  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<RgbNhwcFrame, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbNhwcFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let mut image = frame.to_rgb_image();
    self.draw.draw_detections(&mut image, result);
    self.save_image(image)?;

    if let Some(record) = &self.record {
      record.record(result, &self.record_path())?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;
  use image::{Rgb, RgbImage};

  #[test]
  fn query_enables_record_with_conf() {
    let url = Url::parse("image:///tmp/out/result.jpg?txt&conf").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), Path::new("/tmp/out/result.jpg"));
    assert_eq!(output.record_path(), Path::new("/tmp/out/result.txt"));
    assert!(output.record.is_some_and(|r| r.with_conf));

    let plain = SaveImageFileOutput::from_url(&Url::parse("image:///tmp/a.png").unwrap()).unwrap();
    assert!(plain.record.is_none());
  }

  #[test]
  fn escaped_url_path_is_written_decoded() {
    let dir = std::env::temp_dir().join(format!("火眼 输出 {}", std::process::id()));
    let path = dir.join("结果 图.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), path.as_path());

    let frame = RgbNhwcFrame::from(RgbImage::new(4, 4));
    output.render_result(&frame, &DetectResult::default()).unwrap();
    let exists = path.exists();
    std::fs::remove_dir_all(&dir).unwrap();
    assert!(exists);
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn saves_image_and_record_creating_directories() {
    let dir = std::env::temp_dir().join(format!("huoyan-save-{}", std::process::id()));
    let path = dir.join("nested").join("out.png");
    let output = SaveImageFileOutput::new(&path).with_record(Some(Record { with_conf: false }));

    let frame = RgbNhwcFrame::from(RgbImage::from_pixel(20, 10, Rgb([9, 9, 9])));
    let result = DetectResult {
      items: vec![DetectItem {
        class_id: 0,
        class_name: "person".into(),
        score: 0.9,
        bbox: [0.0, 0.0, 10.0, 10.0],
      }]
      .into(),
      image_shape: (10, 20),
      ..Default::default()
    };
    output.render_result(&frame, &result).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    let record = std::fs::read_to_string(output.record_path()).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    assert_eq!(saved.dimensions(), (20, 10));
    assert_eq!(record, "0 0.25 0.5 0.5 1\n");
  }
}
