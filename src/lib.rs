//! CAD図面の文字抽出ツール
//!
//! DWGを外部の変換ツールでDXFにし、オペレータが選んだ特徴文字と
//! 同じ画層・近い位置にある文字をフォルダ内の全図面から集めて出力する。

pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod export;
pub mod scanner;
pub mod session;
pub mod workspace;
