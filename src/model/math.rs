// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/math.rs - 概率归一化函数
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

/// `e^x / (1 + e^x)`，对正数改写为 `1 / (1 + e^-x)` 以免溢出
pub fn sigmoid(x: f32) -> f32 {
  if x >= 0.0 {
    1.0 / (1.0 + (-x).exp())
  } else {
    let k = x.exp();
    k / (1.0 + k)
  }
}

/// 数值稳定的 softmax：先减去最大值，再在 f64 中累加
pub fn softmax(logits: &[f32]) -> Box<[f32]> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exp: Vec<f64> = logits
    .iter()
    .map(|&v| ((v - max) as f64).exp())
    .collect();
  let sum: f64 = exp.iter().sum();
  exp.into_iter().map(|v| (v / sum) as f32).collect()
}

/// 返回最大值的下标和值；并列时取最靠前的一个
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (index, &value) in values.iter().enumerate() {
    match best {
      Some((_, current)) if value <= current => {}
      _ => best = Some((index, value)),
    }
  }
  best
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sigmoid_midpoint_and_bounds() {
    assert_eq!(sigmoid(0.0), 0.5);
    assert!(sigmoid(100.0) <= 1.0 && sigmoid(100.0) > 0.99);
    assert!(sigmoid(-100.0) >= 0.0 && sigmoid(-100.0) < 0.01);
    assert!(!sigmoid(1000.0).is_nan());
    assert!(!sigmoid(-1000.0).is_nan());
  }

  #[test]
  fn sigmoid_is_monotonic() {
    let mut last = sigmoid(-20.0);
    for i in -199..=200 {
      let v = sigmoid(i as f32 * 0.1);
      assert!(v >= last);
      last = v;
    }
  }

  #[test]
  fn softmax_sums_to_one() {
    let cases: [&[f32]; 4] = [
      &[0.0, 0.0],
      &[1.0, 2.0, 3.0],
      &[-50.0, 10.0, 80.0, 0.5],
      &[1000.0, 999.0],
    ];
    for logits in cases {
      let p = softmax(logits);
      let sum: f32 = p.iter().sum();
      assert!((sum - 1.0).abs() < 1e-5, "sum = {}", sum);
    }
  }

  #[test]
  fn softmax_is_shift_invariant() {
    let a = softmax(&[0.3, -1.2, 2.5]);
    let b = softmax(&[10.3, 8.8, 12.5]);
    for (x, y) in a.iter().zip(b.iter()) {
      assert!((x - y).abs() < 1e-5);
    }
  }

  #[test]
  fn argmax_prefers_first_tie() {
    assert_eq!(argmax(&[0.25, 0.5, 0.5]), Some((1, 0.5)));
    assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
    assert_eq!(argmax(&[]), None);
  }
}
