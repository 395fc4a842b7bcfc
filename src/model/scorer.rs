// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/scorer.rs - 类别打分
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

use crate::model::{
  WithLabel,
  math::{argmax, sigmoid, softmax},
};

/// 类别名称表，可以短于类别数量
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

impl LabelTable {
  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

impl WithLabel for LabelTable {
  fn label_of(&self, class_index: usize) -> String {
    self
      .names
      .get(class_index)
      .cloned()
      .unwrap_or_else(|| class_index.to_string())
  }
}

/// 单个候选框的打分结果
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScore {
  pub box_confidence: f32,
  pub class_index: usize,
  pub distribution: Box<[f32]>,
  pub confidence: f32,
}

pub struct ClassScorer;

impl ClassScorer {
  /// 对置信度 logit 做 sigmoid，对类别 logit 做 softmax，取最高类别
  ///
  /// 不做任何阈值过滤。`class_logits` 为空时返回 `None`。
  pub fn score(confidence_logit: f32, class_logits: &[f32]) -> Option<ClassScore> {
    let box_confidence = sigmoid(confidence_logit);
    let distribution = softmax(class_logits);
    let (class_index, top) = argmax(&distribution)?;

    Some(ClassScore {
      box_confidence,
      class_index,
      confidence: box_confidence * top,
      distribution,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uniform_logits_give_quarter_confidence() {
    let score = ClassScorer::score(0.0, &[0.0, 0.0]).unwrap();
    assert_eq!(score.box_confidence, 0.5);
    assert_eq!(score.class_index, 0);
    assert!((score.distribution[0] - 0.5).abs() < 1e-6);
    assert!((score.distribution[1] - 0.5).abs() < 1e-6);
    assert!((score.confidence - 0.25).abs() < 1e-6);
  }

  #[test]
  fn picks_highest_class() {
    let score = ClassScorer::score(5.0, &[0.1, 3.0, -2.0]).unwrap();
    assert_eq!(score.class_index, 1);
    assert!(score.confidence < score.box_confidence);
    assert!(score.confidence > 0.0);
  }

  #[test]
  fn empty_class_logits_yield_none() {
    assert!(ClassScorer::score(0.0, &[]).is_none());
  }

  #[test]
  fn labels_fall_back_to_index() {
    let labels: LabelTable = ["person", "car"].into_iter().collect();
    assert_eq!(labels.label_of(1), "car");
    assert_eq!(labels.label_of(2), "2");
    assert_eq!(LabelTable::default().label_of(7), "7");
  }
}
