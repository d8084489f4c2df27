//! セッション操作の結合テスト
//!
//! 変換ツールは FakeConverter で置き換える

mod support;

use cad_text_common::{Point2, ReferencePattern};
use cad_text_rust::cli::ExportFormat;
use cad_text_rust::converter::BATCH_FILTER;
use cad_text_rust::error::CadTextError;
use cad_text_rust::scanner::DrawingInfo;
use cad_text_rust::session::Session;
use cad_text_rust::workspace::Workspace;
use support::{
    dxf_with_entities, text, title_block, title_block_without_follow_flag, FakeConverter, FakeMode,
};
use tempfile::tempdir;

fn reference() -> ReferencePattern {
    ReferencePattern::new("TXT", Point2::new(100.0, 200.0), 20.0)
}

/// A.dwg: 一致2件 / B.dwg: 一致なし / C.dxf: 壊れたDXF
fn populate_folder(folder: &std::path::Path) {
    let a = format!(
        "{}{}{}",
        text("TXT", "FOO", 110.0, 205.0),
        text("DIM", "NOT ME", 100.0, 200.0),
        title_block("TXT", &[("BAR", 100.0, 215.0)]),
    );
    let b = text("TXT", "FAR", 130.0, 200.0);
    std::fs::write(folder.join("A.dwg"), dxf_with_entities(&a)).unwrap();
    std::fs::write(folder.join("B.dwg"), dxf_with_entities(&b)).unwrap();
    std::fs::write(folder.join("C.dxf"), "  0\nSECTION\n  2\nENTITIES\n  0\nTEXT\n 10\nbroken\n").unwrap();
}

/// 特徴未設定での一括抽出は警告として拒否
#[tokio::test]
async fn test_batch_without_reference_is_refused() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    populate_folder(folder.path());

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Copy);
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();

    let err = session
        .batch_process(&converter, &workspace, |_, _, _| {})
        .await
        .unwrap_err();

    assert!(matches!(err, CadTextError::NoReferencePattern));
    assert!(err.is_warning());
    assert_eq!(converter.call_count(), 0);
}

/// プレビュー → 特徴選択 → 一括抽出 → 出力
#[tokio::test]
async fn test_full_flow() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    let out = tempdir().unwrap();
    populate_folder(folder.path());

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Copy);
    let mut session = Session::new();

    let drawings = session.load_folder(folder.path()).unwrap().to_vec();
    assert_eq!(drawings.len(), 3);
    assert_eq!(drawings[0].file_name, "A.dwg");

    // プレビュー
    let items = session
        .preview_drawing(&converter, &workspace, &drawings[0])
        .await
        .unwrap()
        .to_vec();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].text, "FOO");
    assert_eq!(items[2].text, "BAR");
    assert_eq!(items[2].layer, "TXT");

    // 単一変換の作業フォルダは空に戻る
    assert_eq!(std::fs::read_dir(workspace.input_dir()).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(workspace.output_dir()).unwrap().count(), 0);
    {
        let calls = converter.calls.borrow();
        assert_eq!(calls[0].filter.as_deref(), Some("A.dwg"));
        assert_eq!(calls[0].input_dir, workspace.input_dir());
    }

    // 特徴選択（FOOの位置）
    let pattern = session.select_anchor(0, 20.0).unwrap().clone();
    assert_eq!(pattern.layer, "TXT");
    assert_eq!(pattern.position, Point2::new(110.0, 205.0));

    // 基準を分かりやすい位置に置き直す（再選択で上書き）
    session.set_reference(reference());
    assert_eq!(session.reference(), Some(&reference()));

    let mut progress = Vec::new();
    let report = session
        .batch_process(&converter, &workspace, |done, total, name| {
            progress.push((done, total, name.to_string()));
        })
        .await
        .unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].file_name, "A.dxf");
    assert_eq!(report.results[0].matched_text, "FOO, BAR");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file_name, "C.dxf");
    assert_eq!(session.results(), report.results.as_slice());

    // 進捗は各図面 + 完了通知
    assert_eq!(progress.len(), 4);
    assert_eq!(progress[0], (0, 3, "A.dxf".to_string()));
    assert_eq!(progress[3].0, 3);

    // 一括変換はフォルダ全体をDWGフィルタ付きで1回
    {
        let calls = converter.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].input_dir, folder.path());
        assert_eq!(calls[1].output_dir, workspace.batch_output_dir());
        assert_eq!(calls[1].filter.as_deref(), Some(BATCH_FILTER));
    }

    // 処理済みの変換DXFは削除される
    assert_eq!(std::fs::read_dir(workspace.batch_output_dir()).unwrap().count(), 0);
    // 元のフォルダは変更しない
    assert!(folder.path().join("C.dxf").exists());

    let path = session.export(ExportFormat::Csv, out.path()).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "見出し + 1行: {:?}", lines);
    assert_eq!(lines[1], "A.dxf,\"FOO, BAR\"");
}

/// DXFのみのフォルダでは変換ツールを呼ばない
#[tokio::test]
async fn test_dxf_only_folder_skips_converter() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    std::fs::write(
        folder.path().join("plan.dxf"),
        dxf_with_entities(&text("TXT", "PLAN-01", 100.0, 200.0)),
    )
    .unwrap();

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Fail);
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();
    session.set_reference(reference());

    let report = session
        .batch_process(&converter, &workspace, |_, _, _| {})
        .await
        .unwrap();

    assert_eq!(converter.call_count(), 0);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].file_name, "plan.dxf");
    assert_eq!(report.results[0].matched_text, "PLAN-01");
    // 元のDXFは削除しない
    assert!(folder.path().join("plan.dxf").exists());
}

/// 変換ツールの失敗は一括処理全体を中断
#[tokio::test]
async fn test_converter_failure_aborts_batch() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    populate_folder(folder.path());

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Fail);
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();
    session.set_reference(reference());

    let err = session
        .batch_process(&converter, &workspace, |_, _, _| {})
        .await
        .unwrap_err();

    assert!(matches!(err, CadTextError::ConverterFailed { code: Some(2), .. }));
    assert!(session.results().is_empty());
}

/// 変換後のDXFが見つからない場合
#[tokio::test]
async fn test_preview_missing_output() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    populate_folder(folder.path());

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::NoOutput);
    let mut session = Session::new();
    let drawing = DrawingInfo::from_path(&folder.path().join("B.dwg")).unwrap();

    let err = session
        .preview_drawing(&converter, &workspace, &drawing)
        .await
        .unwrap_err();

    assert!(matches!(err, CadTextError::ConvertedFileMissing(ref name) if name == "B.dxf"));
    assert!(session.preview().is_none());
    // 入力用コピーは残らない
    assert_eq!(std::fs::read_dir(workspace.input_dir()).unwrap().count(), 0);
}

/// 特徴選択のエラー
#[tokio::test]
async fn test_select_anchor_errors() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    populate_folder(folder.path());

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Copy);
    let mut session = Session::new();

    assert!(matches!(session.select_anchor(0, 20.0), Err(CadTextError::NoPreview)));

    let drawing = DrawingInfo::from_path(&folder.path().join("B.dwg")).unwrap();
    session.preview_drawing(&converter, &workspace, &drawing).await.unwrap();

    assert!(matches!(
        session.select_anchor(5, 20.0),
        Err(CadTextError::AnchorOutOfRange { index: 5, len: 1 })
    ));
    assert!(matches!(session.select_anchor(0, -1.0), Err(CadTextError::Config(_))));
    assert!(session.reference().is_none());

    session.select_anchor(0, 5.0).unwrap();
    assert_eq!(session.reference().map(|r| r.threshold), Some(5.0));
}

/// 一致なしなら出力は拒否される
#[tokio::test]
async fn test_no_match_export_refused() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    let out = tempdir().unwrap();
    std::fs::write(
        folder.path().join("x.dxf"),
        dxf_with_entities(&text("OTHER", "X", 100.0, 200.0)),
    )
    .unwrap();

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Copy);
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();
    session.set_reference(reference());

    let report = session
        .batch_process(&converter, &workspace, |_, _, _| {})
        .await
        .unwrap();
    assert!(report.results.is_empty());
    assert!(report.failures.is_empty());

    let err = session.export(ExportFormat::Csv, out.path()).unwrap_err();
    assert!(matches!(err, CadTextError::NoResults));
}

/// 出力されなかったDWGは失敗として記録し、同名のDXFは二重に数えない
#[tokio::test]
async fn test_missing_conversion_output_is_reported() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    let a = text("TXT", "FROM-DWG", 100.0, 200.0);
    let a_folder = text("TXT", "FROM-FOLDER-DXF", 100.0, 200.0);
    let b = text("TXT", "LOST", 100.0, 200.0);
    std::fs::write(folder.path().join("A.dwg"), dxf_with_entities(&a)).unwrap();
    std::fs::write(folder.path().join("A.dxf"), dxf_with_entities(&a_folder)).unwrap();
    std::fs::write(folder.path().join("B.dwg"), dxf_with_entities(&b)).unwrap();

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::CopyOnly("A"));
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();
    session.set_reference(reference());

    let report = session
        .batch_process(&converter, &workspace, |_, _, _| {})
        .await
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].file_name, "A.dxf");
    assert_eq!(report.results[0].matched_text, "FROM-DWG");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file_name, "B.dwg");
    assert!(report.failures[0].message.contains("B.dxf"));
    // 元のDXFは削除しない
    assert!(folder.path().join("A.dxf").exists());
}

/// 属性フラグのないブロック参照は、その図面だけ失敗として扱う
#[tokio::test]
async fn test_malformed_attribs_do_not_stop_batch() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    std::fs::write(
        folder.path().join("bad.dxf"),
        dxf_with_entities(&title_block_without_follow_flag("TXT", "X", 100.0, 200.0)),
    )
    .unwrap();
    std::fs::write(
        folder.path().join("good.dxf"),
        dxf_with_entities(&title_block("TXT", &[("A-101", 100.0, 205.0)])),
    )
    .unwrap();

    let workspace = Workspace::create(work.path()).unwrap();
    let converter = FakeConverter::new(FakeMode::Copy);
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();
    session.set_reference(reference());

    let report = session
        .batch_process(&converter, &workspace, |_, _, _| {})
        .await
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file_name, "bad.dxf");
    assert!(report.failures[0].message.contains("attributes-follow"));
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].file_name, "good.dxf");
    assert_eq!(report.results[0].matched_text, "A-101");
}

/// 失敗した一括抽出は前回の結果を消さない
#[tokio::test]
async fn test_failed_batch_keeps_previous_results() {
    let folder = tempdir().unwrap();
    let work = tempdir().unwrap();
    let out = tempdir().unwrap();
    populate_folder(folder.path());

    let workspace = Workspace::create(work.path()).unwrap();
    let mut session = Session::new();
    session.load_folder(folder.path()).unwrap();
    session.set_reference(reference());

    session
        .batch_process(&FakeConverter::new(FakeMode::Copy), &workspace, |_, _, _| {})
        .await
        .unwrap();
    assert_eq!(session.results().len(), 1);

    let err = session
        .batch_process(&FakeConverter::new(FakeMode::Fail), &workspace, |_, _, _| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CadTextError::ConverterFailed { .. }));
    assert_eq!(session.results().len(), 1);
    assert_eq!(session.results()[0].matched_text, "FOO, BAR");

    // フォルダが消えても同様
    drop(folder);
    let err = session
        .batch_process(&FakeConverter::new(FakeMode::Copy), &workspace, |_, _, _| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CadTextError::FolderNotFound(_)));
    assert_eq!(session.results().len(), 1);

    assert!(session.export(ExportFormat::Csv, out.path()).is_ok());
}
