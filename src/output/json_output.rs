// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/json_output.rs - JSON 检测结果输出
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

use std::{
  io::Write,
  path::Path,
  sync::{Mutex, PoisonError},
};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Detection, DetectionSet, palette::ColorTable},
  output::Render,
  url_path,
};

#[derive(Error, Debug)]
pub enum JsonOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出写入器已损坏")]
  Poisoned,
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl<T> From<PoisonError<T>> for JsonOutputError {
  fn from(_: PoisonError<T>) -> Self {
    JsonOutputError::Poisoned
  }
}

#[derive(Serialize)]
struct DetectionRecord<'a> {
  #[serde(flatten)]
  detection: &'a Detection,
  color: [u8; 3],
}

#[derive(Serialize)]
struct ImageRecord<'a> {
  image: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  detections: Option<Vec<DetectionRecord<'a>>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
}

/// 每次渲染写出一个 JSON 文档（一行），连续任务下即为 JSON Lines
pub struct JsonOutput {
  writer: Mutex<Box<dyn Write + Send>>,
  colors: ColorTable,
  pretty: bool,
}

impl FromUrlWithScheme for JsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonOutput {
  type Error = JsonOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let pretty = uri.query_pairs().any(|(k, _)| k == "pretty");
    let path = url_path(uri);
    let writer: Box<dyn Write + Send> = if path.is_empty() || path == "-" {
      Box::new(std::io::stdout())
    } else {
      if let Some(parent) = Path::new(&path).parent()
        && !parent.as_os_str().is_empty()
      {
        std::fs::create_dir_all(parent)?;
      }
      info!("检测结果写入文件: {}", path);
      Box::new(std::fs::File::create(&path)?)
    };

    Ok(JsonOutput {
      writer: Mutex::new(writer),
      colors: ColorTable::default(),
      pretty,
    })
  }
}

impl JsonOutput {
  pub fn to_writer<W: Write + Send + 'static>(writer: W) -> Self {
    Self {
      writer: Mutex::new(Box::new(writer)),
      colors: ColorTable::default(),
      pretty: false,
    }
  }

  pub fn with_colors(mut self, colors: ColorTable) -> Self {
    self.colors = colors;
    self
  }

  fn records<'a>(&self, result: &'a DetectionSet) -> Vec<ImageRecord<'a>> {
    result
      .iter()
      .map(|(image, outcome)| match outcome {
        Ok(items) => ImageRecord {
          image,
          detections: Some(
            items
              .iter()
              .map(|detection| DetectionRecord {
                detection,
                color: self.colors.color_for(detection.class_index),
              })
              .collect(),
          ),
          error: None,
        },
        Err(e) => ImageRecord {
          image,
          detections: None,
          error: Some(e.to_string()),
        },
      })
      .collect()
  }
}

impl Render<DetectionSet> for JsonOutput {
  type Error = JsonOutputError;

  fn render_result(&self, result: &DetectionSet) -> Result<(), Self::Error> {
    let records = self.records(result);
    let mut writer = self.writer.lock()?;
    if self.pretty {
      serde_json::to_writer_pretty(&mut *writer, &records)?;
    } else {
      serde_json::to_writer(&mut *writer, &records)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
  }
}
