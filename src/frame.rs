// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 模型输出张量帧定义
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

/// 推理引擎为单张图像产出的只读展平张量
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
  data: Box<[f32]>,
}

impl From<Vec<f32>> for RawTensor {
  fn from(data: Vec<f32>) -> Self {
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl From<&[f32]> for RawTensor {
  fn from(data: &[f32]) -> Self {
    Self { data: data.into() }
  }
}

impl AsRef<[f32]> for RawTensor {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

impl RawTensor {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 按小端序 f32 解析字节流；长度不是 4 的倍数时返回 `None`
  pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
    if bytes.len() % 4 != 0 {
      return None;
    }
    let data = bytes
      .chunks_exact(4)
      .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect();
    Some(Self { data })
  }
}

/// 带图像标识的张量
#[derive(Debug, Clone, PartialEq)]
pub struct TensorFrame {
  pub id: String,
  pub tensor: RawTensor,
}

impl TensorFrame {
  pub fn new(id: impl Into<String>, tensor: impl Into<RawTensor>) -> Self {
    Self {
      id: id.into(),
      tensor: tensor.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_little_endian_floats() {
    let mut bytes = Vec::new();
    for v in [1.5f32, -2.0, 0.25] {
      bytes.extend_from_slice(&v.to_le_bytes());
    }
    let tensor = RawTensor::from_le_bytes(&bytes).unwrap();
    assert_eq!(tensor.as_ref(), &[1.5, -2.0, 0.25]);
  }

  #[test]
  fn rejects_truncated_bytes() {
    assert!(RawTensor::from_le_bytes(&[0, 0, 0]).is_none());
  }
}
