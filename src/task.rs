// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 解码任务
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

use std::{thread, time::Duration};
use tracing::{info, warn};

use crate::{
  frame::TensorFrame,
  model::{DetectionSet, Model},
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 收集全部输入后整批解码一次
pub struct OneShotTask;

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = TensorFrame>,
  M: Model<Input = [TensorFrame], Output = DetectionSet, Error = ME>,
  O: Render<DetectionSet, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frames: Vec<TensorFrame> = input.collect();
    if frames.is_empty() {
      return Err(anyhow::anyhow!("没有输入张量"));
    }
    info!("读取 {} 个输入张量，开始解码...", frames.len());
    let now = std::time::Instant::now();
    let result = model.infer(frames.as_slice())?;
    let elapsed = now.elapsed();
    info!(
      "解码完成，耗时: {:.2?}，检测总数: {}，失败图像: {}",
      elapsed,
      result.total_detections(),
      result.failures().count()
    );
    output.render_result(&result)?;

    Ok(())
  }
}

/// 重复解码同一批输入，统计平均耗时
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(3);
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = TensorFrame>,
  M: Model<Input = [TensorFrame], Output = DetectionSet, Error = ME>,
  O: Render<DetectionSet, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frames: Vec<TensorFrame> = input.collect();
    if frames.is_empty() {
      return Err(anyhow::anyhow!("没有输入张量"));
    }
    info!("读取 {} 个输入张量，开始解码...", frames.len());
    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      let result = model.infer(frames.as_slice())?;
      let elapsed = now.elapsed();
      info!("({})解码完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&result)?;
    }

    // 前两次视为预热
    warn!(
      "平均解码时间: {:.2?}",
      times.iter().skip(2).sum::<Duration>() / (times.len() - 2) as u32
    );

    Ok(())
  }
}

/// 逐帧解码，直到输入耗尽、达到帧数上限或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = TensorFrame>,
  M: Model<Input = [TensorFrame], Output = DetectionSet, Error = ME>,
  O: Render<DetectionSet, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let mut frame_index = 0usize;
    let mut now = std::time::Instant::now();
    for frame in input {
      frame_index = frame_index.wrapping_add(1);
      info!("处理第 {} 个张量: {}", frame_index, frame.id);
      let result = model.infer(std::slice::from_ref(&frame))?;
      let elapsed_a = now.elapsed();
      output.render_result(&result)?;
      let elapsed_b = now.elapsed();
      now = std::time::Instant::now();
      info!("解码完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，退出");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible};

  use super::*;
  use crate::model::{
    GridDecoder, anchor::AnchorTable, layout::LayoutConfig, nms::SuppressionParams,
  };

  struct Collect(RefCell<Vec<DetectionSet>>);

  impl Render<DetectionSet> for Collect {
    type Error = Infallible;

    fn render_result(&self, result: &DetectionSet) -> Result<(), Self::Error> {
      self.0.borrow_mut().push(result.clone());
      Ok(())
    }
  }

  impl Render<DetectionSet> for &Collect {
    type Error = Infallible;

    fn render_result(&self, result: &DetectionSet) -> Result<(), Self::Error> {
      (*self).render_result(result)
    }
  }

  fn decoder() -> GridDecoder {
    GridDecoder::builder()
      .layout(LayoutConfig {
        row_count: 1,
        column_count: 1,
        class_count: 2,
        boxes_per_cell: 1,
        cell_width: 32,
        cell_height: 32,
      })
      .anchors(AnchorTable::from(&[(1.0, 1.0)][..]))
      .params(SuppressionParams::default())
      .build()
      .unwrap()
  }

  fn frames() -> Vec<TensorFrame> {
    vec![
      TensorFrame::new("a", vec![0.0; 7]),
      TensorFrame::new("b", vec![0.0; 6]),
    ]
  }

  #[test]
  fn one_shot_renders_whole_batch_once() {
    let sink = Collect(RefCell::new(Vec::new()));
    OneShotTask
      .run_task(frames().into_iter(), decoder(), &sink)
      .unwrap();
    let rendered = sink.0.borrow();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].len(), 2);
    assert_eq!(rendered[0].detections("a").map(|d| d.len()), Some(1));
    assert_eq!(rendered[0].failures().count(), 1);
  }

  #[test]
  fn one_shot_without_input_fails() {
    let sink = Collect(RefCell::new(Vec::new()));
    assert!(
      OneShotTask
        .run_task(Vec::<TensorFrame>::new().into_iter(), decoder(), &sink)
        .is_err()
    );
  }

  #[test]
  fn repeat_shot_renders_last_result() {
    let sink = Collect(RefCell::new(Vec::new()));
    RepeatShotTask::default()
      .with_repeat_times(4)
      .run_task(frames().into_iter(), decoder(), &sink)
      .unwrap();
    assert_eq!(sink.0.borrow().len(), 1);
  }
}
