// 该文件是 Huoyan （火眼） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbNhwcFrame, url_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("图像文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像为空: {0}")]
  EmptyImage(PathBuf),
}

pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    Self::open(url_path(url))
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    if !path.exists() {
      error!("图像文件不存在: {}", path.display());
      return Err(ImageFileInputError::NotFound(path.to_path_buf()));
    }

    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    if image.width() == 0 || image.height() == 0 {
      return Err(ImageFileInputError::EmptyImage(path.to_path_buf()));
    }
    info!(
      "读取图像: {} ({}x{})",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(Self { image: Some(image) })
  }

  pub fn into_nhwc(self) -> ImageFileInputNhwc {
    ImageFileInputNhwc { inner: self }
  }
}

pub struct ImageFileInputNhwc {
  inner: ImageFileInput,
}

impl Iterator for ImageFileInputNhwc {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.image.take().map(RgbNhwcFrame::from)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn missing_file_is_not_found() {
    let url = Url::parse("image:///definitely/not/here.jpg").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::NotFound(_))
    ));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("video:///tmp/a.mp4").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemeMismatch)
    ));
  }

  #[test]
  fn opens_path_with_space_and_cjk_characters() {
    let dir = std::env::temp_dir().join(format!("火眼 输入 {}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("公交 车.png");
    RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let input = ImageFileInput::from_url(&url);
    std::fs::remove_dir_all(&dir).unwrap();

    let frame = input.unwrap().into_nhwc().next().unwrap();
    assert_eq!(&frame.as_nhwc()[..3], &[1, 2, 3]);
  }

  #[test]
  fn reads_png_as_single_rgb_frame() {
    let path = std::env::temp_dir().join(format!("huoyan-read-{}.png", std::process::id()));
    RgbImage::from_pixel(4, 3, Rgb([10, 20, 30])).save(&path).unwrap();

    let url = Url::from_file_path(&path)
      .map(|u| format!("image://{}", u.path()))
      .unwrap();
    let input = ImageFileInput::from_url(&Url::parse(&url).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut frames = input.into_nhwc();
    let frame = frames.next().unwrap();
    assert_eq!((frame.height(), frame.width()), (3, 4));
    assert_eq!(&frame.as_nhwc()[..3], &[10, 20, 30]);
    assert!(frames.next().is_none());
  }
}
