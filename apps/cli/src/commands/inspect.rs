//! inspect 命令
//!
//! 显示 .ebs 文件的头部、保持值统计和前向填充后的前 N 帧。
//! 数据区损坏或截断时仍显示头部，随后报告解码错误。

use anyhow::{Context, Result};
use clap::Args;
use evobot_player::FrameReconstructor;
use evobot_protocol::{JointFrame, SequenceData, SequenceHeader, decode, decode_header};
use serde::Serialize;
use std::path::PathBuf;

/// 检查命令参数
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// .ebs 文件路径
    pub file: PathBuf,

    /// 显示的帧数（前向填充后）
    #[arg(short = 'n', long, default_value_t = 0)]
    pub frames: usize,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

/// JSON 输出结构
#[derive(Debug, Serialize)]
struct InspectReport {
    header: SequenceHeader,
    /// 头部声明的文件长度
    expected_len: usize,
    /// 实际文件长度
    actual_len: usize,
    /// 数据区解码结果（失败时为 `None`）
    #[serde(flatten)]
    body: Option<BodyReport>,
    /// 数据区解码错误
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BodyReport {
    #[serde(skip)]
    info: String,
    left_holds: usize,
    right_holds: usize,
    frames: Vec<FilledFrame>,
}

#[derive(Debug, Serialize)]
struct FilledFrame {
    index: usize,
    left: JointFrame,
    right: JointFrame,
}

impl InspectCommand {
    pub async fn execute(&self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .with_context(|| format!("读取文件失败: {}", self.file.display()))?;
        // 头部无效时没有可显示的内容
        let header = decode_header(&bytes)
            .with_context(|| format!("解码失败: {}", self.file.display()))?;

        let report = build_report(header, &bytes, self.frames);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            self.print_report(&report);
        }

        if let Some(error) = &report.error {
            anyhow::bail!("解码失败: {}: {}", self.file.display(), error);
        }
        Ok(())
    }

    fn print_report(&self, report: &InspectReport) {
        let header = &report.header;
        println!("📁 文件: {}", self.file.display());
        println!("   名称: {}", header.name);
        println!("   采样率: {:.1} Hz", header.sample_rate);
        println!("   时长: {:.3} s", header.total_duration);
        println!("   帧数: {}", header.frame_count);
        println!("   编译时间: {}", header.compiled_at);
        println!(
            "   长度: {} 字节（头部声明 {} 字节）",
            report.actual_len, report.expected_len
        );

        let Some(body) = &report.body else {
            println!("⚠️  数据区无法解码");
            return;
        };
        println!("   {}", body.info);
        println!(
            "   保持值: 左臂 {} / 右臂 {}",
            body.left_holds, body.right_holds
        );

        if !body.frames.is_empty() {
            println!();
            for frame in &body.frames {
                println!(
                    "[{:>5}] L={:?} R={:?}",
                    frame.index, frame.left, frame.right
                );
            }
        }
    }
}

fn build_report(header: SequenceHeader, bytes: &[u8], frames: usize) -> InspectReport {
    let expected_len = header.expected_len();
    let (body, error) = match decode(bytes) {
        Ok(sequence) => (Some(build_body(&sequence, frames)), None),
        Err(e) => (None, Some(e.to_string())),
    };

    InspectReport {
        header,
        expected_len,
        actual_len: bytes.len(),
        body,
        error,
    }
}

fn build_body(sequence: &SequenceData, frames: usize) -> BodyReport {
    let (left_holds, right_holds) = sequence.hold_counts();

    let mut reconstructor = FrameReconstructor::new();
    let frames = sequence
        .left_arm
        .iter()
        .zip(&sequence.right_arm)
        .take(frames)
        .enumerate()
        .map(|(index, (left, right))| {
            let (left, right) = reconstructor.reconstruct(left, right);
            FilledFrame { index, left, right }
        })
        .collect();

    BodyReport {
        info: sequence.info(),
        left_holds,
        right_holds,
        frames,
    }
}
