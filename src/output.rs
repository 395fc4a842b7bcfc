// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
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

use crate::model::{DetectionSet, palette::ColorTable};
use crate::{FromUrl, FromUrlWithScheme};
use thiserror::Error;
use url::Url;

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

mod directory_record;
mod json_output;
mod log_output;

pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError, Record};
pub use self::json_output::{JsonOutput, JsonOutputError};
pub use self::log_output::LogOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("JSON 输出错误: {0}")]
  JsonOutputError(#[from] JsonOutputError),
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

impl From<std::convert::Infallible> for OutputError {
  fn from(e: std::convert::Infallible) -> Self {
    match e {}
  }
}

pub enum OutputWrapper {
  JsonOutput(JsonOutput),
  DirectoryRecordOutput(DirectoryRecordOutput),
  LogOutput(LogOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      JsonOutput::SCHEME => {
        let output = JsonOutput::from_url(url)?;
        Ok(OutputWrapper::JsonOutput(output))
      }
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      LogOutput::SCHEME => {
        let output = LogOutput::from_url(url)?;
        Ok(OutputWrapper::LogOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl OutputWrapper {
  /// 设置展示颜色，仅对 JSON 输出生效
  pub fn with_colors(self, colors: &ColorTable) -> Self {
    match self {
      OutputWrapper::JsonOutput(output) => {
        OutputWrapper::JsonOutput(output.with_colors(colors.clone()))
      }
      other => other,
    }
  }
}

impl Render<DetectionSet> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &DetectionSet) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::JsonOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
      OutputWrapper::LogOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::model::{DecodeError, Detection, geometry::Rect};

  #[derive(Clone, Default)]
  struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

  impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn json_has_one_entry_per_image() {
    let buffer = SharedBuffer::default();
    let output = JsonOutput::to_writer(buffer.clone());

    let mut set = DetectionSet::default();
    set.insert(
      "ok",
      Ok(
        vec![Detection {
          rect: Rect::new(0, 0, 4, 4),
          label: "cat".to_string(),
          confidence: 0.75,
          class_index: 1,
          class_scores: vec![0.25, 0.75].into_boxed_slice(),
        }]
        .into_boxed_slice(),
      ),
    );
    set.insert(
      "bad",
      Err(DecodeError::Shape {
        expected: 7,
        actual: 6,
      }),
    );
    output.render_result(&set).unwrap();

    let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    let images = value.as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["image"], "bad");
    assert!(images[0]["error"].as_str().unwrap().contains('7'));
    assert_eq!(images[1]["image"], "ok");
    let det = &images[1]["detections"][0];
    assert_eq!(det["label"], "cat");
    assert_eq!(det["rect"]["width"], 4);
    assert_eq!(det["color"], serde_json::json!([255, 0, 255]));
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("rtsp://localhost/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch)
    ));
  }
}
