// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  model::{COCO_CLASSES, DetectItem, DetectResult},
  output::Palette,
};

const DEFAULT_LINE_THICKNESS: u32 = 3;
const LABEL_TEXT_COLOR: [u8; 3] = [225, 255, 255];
// 线宽为 3 时的字号
const LABEL_FONT_SIZE: f32 = 24.0;
const LABEL_MIN_FONT_SIZE: f32 = 10.0;
const LABEL_PADDING: i32 = 3;

#[derive(Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无法解析字体文件: {0}")]
  InvalidFont(String),
}

pub fn load_font(path: &Path) -> Result<FontVec, FontError> {
  let data = std::fs::read(path)?;
  let font =
    FontVec::try_from_vec(data).map_err(|_| FontError::InvalidFont(path.display().to_string()))?;
  info!("加载字体: {}", path.display());
  Ok(font)
}

pub struct Draw {
  /// `None` 时按图像尺寸推算
  line_thickness: Option<u32>,
  hide_labels: bool,
  hide_conf: bool,
  font: Option<FontVec>,
  palette: Palette,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      line_thickness: Some(DEFAULT_LINE_THICKNESS),
      hide_labels: false,
      hide_conf: false,
      font: None,
      palette: Palette::new(COCO_CLASSES.len(), None),
    }
  }
}

impl Draw {
  pub fn with_line_thickness(mut self, line_thickness: Option<u32>) -> Self {
    self.line_thickness = line_thickness.filter(|t| *t > 0);
    self
  }

  pub fn with_hide_labels(mut self, hide_labels: bool) -> Self {
    self.hide_labels = hide_labels;
    self
  }

  pub fn with_hide_conf(mut self, hide_conf: bool) -> Self {
    self.hide_conf = hide_conf;
    self
  }

  pub fn with_font(mut self, font: Option<FontVec>) -> Self {
    self.font = font;
    self
  }

  pub fn with_palette(mut self, palette: Palette) -> Self {
    self.palette = palette;
    self
  }

  pub fn line_thickness_for(&self, image: &RgbImage) -> u32 {
    self.line_thickness.unwrap_or_else(|| {
      (0.002 * (image.width() + image.height()) as f32 / 2.0).round() as u32 + 1
    })
  }

  pub fn label_for(&self, item: &DetectItem) -> Option<String> {
    if self.hide_labels {
      None
    } else if self.hide_conf {
      Some(item.class_name.clone())
    } else {
      Some(format!("{} {:.2}", item.class_name, item.score))
    }
  }

  /// 分数最高的框最后绘制，位于最上层
  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectResult) {
    if self.font.is_none() && !self.hide_labels {
      debug!("未加载字体，只绘制边框");
    }
    for item in result.items.iter().rev() {
      let color = self.palette.color(item.class_id);
      let label = self.label_for(item);
      self.plot_one_box(image, &item.bbox, color, label.as_deref());
    }
    debug!("绘制 {} 个检测框", result.len());
  }

  /// bbox 为原图像素坐标 [x_min, y_min, x_max, y_max]
  pub fn plot_one_box(&self, image: &mut RgbImage, bbox: &[f32; 4], color: [u8; 3], label: Option<&str>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = bbox[0].round() as i32;
    let y_min = bbox[1].round() as i32;
    let x_max = bbox[2].round() as i32;
    let y_max = bbox[3].round() as i32;
    if x_min > x_max || y_min > y_max {
      return;
    }

    let tl = self.line_thickness_for(image) as i32;

    // 线宽以边框为中心向两侧展开
    for i in 0..tl {
      let offset = i - tl / 2;
      let rect_w = x_max - x_min - 2 * offset + 1;
      let rect_h = y_max - y_min - 2 * offset + 1;
      if rect_w <= 0 || rect_h <= 0 {
        continue;
      }
      let rect = Rect::at(x_min + offset, y_min + offset).of_size(rect_w as u32, rect_h as u32);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }

    let (Some(label), Some(font)) = (label, self.font.as_ref()) else {
      return;
    };

    let scale = PxScale::from((LABEL_FONT_SIZE * tl as f32 / DEFAULT_LINE_THICKNESS as f32).max(LABEL_MIN_FONT_SIZE));
    let (text_w, text_h) = text_size(scale, font, label);
    if text_w == 0 || text_h == 0 {
      return;
    }

    // 标签位于框的左上角上方，超出图像顶部时下移
    let label_h = text_h as i32 + LABEL_PADDING;
    let label_y = (y_min - label_h).max(0);
    let rect = Rect::at(x_min, label_y).of_size(text_w, label_h as u32);
    draw_filled_rect_mut(image, rect, Rgb(color));
    draw_text_mut(
      image,
      Rgb(LABEL_TEXT_COLOR),
      x_min,
      label_y + LABEL_PADDING / 2,
      scale,
      font,
      label,
    );
  }
}
