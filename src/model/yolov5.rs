// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/yolov5.rs - 基于 ONNX Runtime 的 YOLOv5 模型
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
use std::sync::Mutex;

use ndarray::Array2;
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNchwFrame,
  letterbox::make_divisible,
  model::{ClassNames, DetectModel, Model, RawPrediction},
  query_flag, query_value, url_path,
};

const YOLOV5_DEFAULT_STRIDE: u32 = 32;
const YOLOV5_DEFAULT_IMG_SIZE: u32 = 640;
const YOLOV5_OUTPUT_RANK: usize = 3;
// x, y, w, h, objectness，再加至少一个类别
const YOLOV5_MIN_OUTPUT_WIDTH: usize = 6;

#[derive(Error, Debug)]
pub enum YoloOnnxError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("推理错误: {0}")]
  InferenceError(String),
  #[error("模型输出无效: {0}")]
  InvalidOutput(String),
  #[error("类别文件读取错误: {0}")]
  LabelsError(#[from] std::io::Error),
  #[error("推理会话锁已失效")]
  SessionPoisoned,
}

impl YoloOnnxError {
  fn load(msg: &str, e: impl std::fmt::Display) -> Self {
    YoloOnnxError::ModelLoadError(format!("{}: {}", msg, e))
  }

  fn inference(msg: &str, e: impl std::fmt::Display) -> Self {
    YoloOnnxError::InferenceError(format!("{}: {}", msg, e))
  }
}

pub struct YoloOnnxBuilder {
  model_path: PathBuf,
  names_path: Option<PathBuf>,
  threads: Option<usize>,
  warmup: bool,
  img_size: u32,
}

impl FromUrlWithScheme for YoloOnnxBuilder {
  const SCHEME: &'static str = "yolov5";
}

impl FromUrl for YoloOnnxBuilder {
  type Error = YoloOnnxError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloOnnxError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let threads = match query_value(url, "threads") {
      Some(v) => Some(v.parse::<usize>().map_err(|e| {
        YoloOnnxError::ModelPathError(format!("threads 参数无效 '{}': {}", v, e))
      })?),
      None => None,
    };

    Ok(YoloOnnxBuilder {
      model_path: url_path(url),
      names_path: query_value(url, "names").map(PathBuf::from),
      threads,
      warmup: query_flag(url, "warmup"),
      img_size: YOLOV5_DEFAULT_IMG_SIZE,
    })
  }
}

impl YoloOnnxBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      names_path: None,
      threads: None,
      warmup: false,
      img_size: YOLOV5_DEFAULT_IMG_SIZE,
    }
  }

  /// 覆盖模型元数据中的类别名
  pub fn names_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.names_path = Some(path.into());
    self
  }

  pub fn threads(mut self, threads: usize) -> Self {
    self.threads = Some(threads);
    self
  }

  pub fn warmup(mut self, warmup: bool) -> Self {
    self.warmup = warmup;
    self
  }

  /// 预热时使用的输入尺寸
  pub fn img_size(mut self, img_size: u32) -> Self {
    self.img_size = img_size;
    self
  }

  pub fn build(self) -> Result<YoloOnnx, YoloOnnxError> {
    if !self.model_path.exists() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(YoloOnnxError::ModelPathError(format!(
        "模型文件不存在: {}",
        self.model_path.display()
      )));
    }

    info!("加载模型文件: {}", self.model_path.display());

    let mut builder = Session::builder().map_err(|e| YoloOnnxError::load("无法创建推理会话", e))?;

    #[cfg(feature = "cuda")]
    {
      info!("启用 CUDA 执行后端");
      builder = builder
        .with_execution_providers([
          ort::execution_providers::CUDAExecutionProvider::default().build(),
        ])
        .map_err(|e| YoloOnnxError::load("无法注册 CUDA 执行后端", e))?;
    }

    builder = builder
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(|e| YoloOnnxError::load("无法设置图优化等级", e))?;

    if let Some(threads) = self.threads {
      debug!("推理线程数: {}", threads);
      builder = builder
        .with_intra_threads(threads)
        .map_err(|e| YoloOnnxError::load("无法设置推理线程数", e))?;
    }

    let session = builder
      .commit_from_file(&self.model_path)
      .map_err(|e| YoloOnnxError::load("无法加载模型", e))?;

    let input_name = session
      .inputs
      .first()
      .map(|i| i.name.clone())
      .ok_or_else(|| YoloOnnxError::ModelLoadError("模型没有输入".to_string()))?;
    let output_name = session
      .outputs
      .first()
      .map(|o| o.name.clone())
      .ok_or_else(|| YoloOnnxError::ModelLoadError("模型没有输出".to_string()))?;
    debug!("模型输入: {}, 模型输出: {}", input_name, output_name);

    let (stride, metadata_names) = read_metadata(&session);

    let names = match &self.names_path {
      Some(path) => {
        info!("从文件读取类别名: {}", path.display());
        ClassNames::from_file(path)?
      }
      None => metadata_names.unwrap_or_else(|| {
        warn!("模型元数据中没有类别名，使用 COCO 类别");
        ClassNames::coco()
      }),
    };
    info!("模型加载完成，步长 {}，类别数 {}", stride, names.len());

    let model = YoloOnnx {
      session: Mutex::new(session),
      input_name,
      output_name,
      stride,
      names,
    };

    if self.warmup {
      let size = make_divisible(self.img_size, model.stride) as usize;
      info!("模型预热: {}x{}", size, size);
      model.infer(&RgbNchwFrame::zeros(size, size))?;
    }

    Ok(model)
  }
}

fn read_metadata(session: &Session) -> (u32, Option<ClassNames>) {
  let metadata = match session.metadata() {
    Ok(metadata) => metadata,
    Err(e) => {
      warn!("无法读取模型元数据: {}", e);
      return (YOLOV5_DEFAULT_STRIDE, None);
    }
  };

  let stride = match metadata.custom("stride") {
    Ok(Some(raw)) => parse_stride(&raw).unwrap_or_else(|| {
      warn!("模型元数据中的步长无效: {}", raw);
      YOLOV5_DEFAULT_STRIDE
    }),
    _ => YOLOV5_DEFAULT_STRIDE,
  };

  let names = match metadata.custom("names") {
    Ok(Some(raw)) => ClassNames::parse_metadata(&raw),
    _ => None,
  };

  (stride, names)
}

/// 步长可能是整数，也可能是 `[8, 16, 32]` 形式的列表，取最大值
fn parse_stride(raw: &str) -> Option<u32> {
  raw
    .trim()
    .trim_matches(|c| c == '[' || c == ']')
    .split(',')
    .map(|s| s.trim().trim_end_matches(".0").parse::<u32>().ok())
    .collect::<Option<Vec<_>>>()?
    .into_iter()
    .max()
    .filter(|stride| *stride > 0)
}

pub struct YoloOnnx {
  session: Mutex<Session>,
  input_name: String,
  output_name: String,
  stride: u32,
  names: ClassNames,
}

impl std::fmt::Debug for YoloOnnx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("YoloOnnx")
      .field("input_name", &self.input_name)
      .field("output_name", &self.output_name)
      .field("stride", &self.stride)
      .field("num_classes", &self.names.len())
      .finish()
  }
}

impl Model for YoloOnnx {
  type Input = RgbNchwFrame;
  type Output = RawPrediction;
  type Error = YoloOnnxError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入: {}x{}", input.height(), input.width());
    let tensor = TensorRef::from_array_view(input.as_nchw().view())
      .map_err(|e| YoloOnnxError::inference("无法构造输入张量", e))?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| YoloOnnxError::SessionPoisoned)?;

    debug!("执行模型推理");
    let outputs = session
      .run(ort::inputs![self.input_name.as_str() => tensor])
      .map_err(|e| YoloOnnxError::inference("推理失败", e))?;

    let output = outputs
      .get(self.output_name.as_str())
      .ok_or_else(|| YoloOnnxError::InvalidOutput(format!("找不到输出 '{}'", self.output_name)))?;
    let (shape, data) = output
      .try_extract_tensor::<f32>()
      .map_err(|e| YoloOnnxError::inference("无法提取输出张量", e))?;
    let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

    to_prediction(&shape, data)
  }
}

/// 取第一个批次的 `[N, 5 + nc]` 预测
fn to_prediction(shape: &[usize], data: &[f32]) -> Result<RawPrediction, YoloOnnxError> {
  if shape.len() != YOLOV5_OUTPUT_RANK || shape[0] == 0 {
    return Err(YoloOnnxError::InvalidOutput(format!(
      "期望形状为 [batch, N, 5 + nc]，实际为 {:?}",
      shape
    )));
  }

  let (rows, cols) = (shape[1], shape[2]);
  if cols < YOLOV5_MIN_OUTPUT_WIDTH {
    return Err(YoloOnnxError::InvalidOutput(format!(
      "输出宽度 {} 小于 {}",
      cols, YOLOV5_MIN_OUTPUT_WIDTH
    )));
  }
  if data.len() < rows * cols {
    return Err(YoloOnnxError::InvalidOutput(format!(
      "输出数据长度 {} 与形状 {:?} 不符",
      data.len(),
      shape
    )));
  }

  debug!("模型输出: {} 个候选框，{} 个类别", rows, cols - 5);
  let array = Array2::from_shape_vec((rows, cols), data[..rows * cols].to_vec())
    .map_err(|e| YoloOnnxError::InvalidOutput(e.to_string()))?;
  Ok(RawPrediction::new(array))
}

impl DetectModel for YoloOnnx {
  fn stride(&self) -> u32 {
    self.stride
  }

  fn class_names(&self) -> &ClassNames {
    &self.names
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_from_url_reads_query() {
    let url = Url::parse("yolov5:///models/yolov5s.onnx?warmup&threads=2&names=/models/names.txt").unwrap();
    let builder = YoloOnnxBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, PathBuf::from("/models/yolov5s.onnx"));
    assert_eq!(builder.names_path, Some(PathBuf::from("/models/names.txt")));
    assert_eq!(builder.threads, Some(2));
    assert!(builder.warmup);
  }

  #[test]
  fn builder_decodes_model_path() {
    let url = Url::parse("yolov5:///模型 目录/yolov5s.onnx").unwrap();
    let builder = YoloOnnxBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, PathBuf::from("/模型 目录/yolov5s.onnx"));
  }

  #[test]
  fn builder_rejects_other_schemes_and_bad_threads() {
    let url = Url::parse("image:///models/yolov5s.onnx").unwrap();
    assert!(matches!(
      YoloOnnxBuilder::from_url(&url),
      Err(YoloOnnxError::ModelPathError(_))
    ));

    let url = Url::parse("yolov5:///models/yolov5s.onnx?threads=many").unwrap();
    assert!(matches!(
      YoloOnnxBuilder::from_url(&url),
      Err(YoloOnnxError::ModelPathError(_))
    ));
  }

  #[test]
  fn missing_model_file_fails_before_loading() {
    let result = YoloOnnxBuilder::new("/nonexistent/huoyan/model.onnx").build();
    assert!(matches!(result, Err(YoloOnnxError::ModelPathError(_))));
  }

  #[test]
  fn stride_metadata_accepts_int_and_list() {
    assert_eq!(parse_stride("32"), Some(32));
    assert_eq!(parse_stride("[8, 16, 32]"), Some(32));
    assert_eq!(parse_stride("64.0"), Some(64));
    assert_eq!(parse_stride("0"), None);
    assert_eq!(parse_stride("abc"), None);
  }

  #[test]
  fn prediction_takes_first_batch() {
    let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
    let pred = to_prediction(&[2, 2, 6], &data).unwrap();
    assert_eq!(pred.num_candidates(), 2);
    assert_eq!(pred.view()[[1, 5]], 11.0);
  }

  #[test]
  fn prediction_rejects_bad_shapes() {
    assert!(to_prediction(&[1, 10], &[0.0; 10]).is_err());
    assert!(to_prediction(&[1, 2, 5], &[0.0; 10]).is_err());
    assert!(to_prediction(&[1, 4, 6], &[0.0; 10]).is_err());
  }
}
