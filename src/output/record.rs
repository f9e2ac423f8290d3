// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/record.rs - YOLO 格式标注记录
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

use tracing::info;

use crate::{model::DetectResult, postprocess::xyxy2xywh};

/// 每个目标一行：`cls xc yc w h [conf]`，坐标按原图尺寸归一化
#[derive(Debug, Clone, Copy, Default)]
pub struct Record {
  pub with_conf: bool,
}

impl Record {
  pub fn lines(&self, result: &DetectResult) -> Vec<String> {
    let (h0, w0) = result.image_shape;
    let (w0, h0) = (w0.max(1) as f32, h0.max(1) as f32);

    result
      .items
      .iter()
      .map(|item| {
        let [xc, yc, w, h] = xyxy2xywh(item.bbox);
        let mut fields = vec![
          item.class_id.to_string(),
          format_g(xc / w0),
          format_g(yc / h0),
          format_g(w / w0),
          format_g(h / h0),
        ];
        if self.with_conf {
          fields.push(format_g(item.score));
        }
        fields.join(" ")
      })
      .collect()
  }

  pub fn record(&self, result: &DetectResult, path: &Path) -> Result<(), std::io::Error> {
    let mut content = self.lines(result).join("\n");
    if !content.is_empty() {
      content.push('\n');
    }
    std::fs::write(path, content)?;
    info!("保存标注到文件: {}", path.display());
    Ok(())
  }
}

// 6 位有效数字，去掉末尾的 0
fn format_g(value: f32) -> String {
  if value == 0.0 {
    return "0".to_string();
  }
  if !value.is_finite() {
    return value.to_string();
  }
  let magnitude = value.abs().log10().floor() as i32;
  let decimals = (5 - magnitude).max(0) as usize;
  let s = format!("{:.*}", decimals, value);
  if s.contains('.') {
    s.trim_end_matches('0').trim_end_matches('.').to_string()
  } else {
    s
  }
}
