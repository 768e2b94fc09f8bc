//! Dispatcher Module
//!
//! 入力ディレクトリのファイルを列挙し、拡張子に応じて
//! 抽出（XLSX）と列変換（CSV）に振り分ける。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::api::{ErrorPolicy, FileKind};
use crate::config::Config;
use crate::error::RemapError;
use crate::extract::extract_first_sheet_with;
use crate::remap::{ColumnRemapper, RemapStats, SANITIZED_PREFIX};

/// 処理に成功した1ファイル分の報告
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// 入力ファイル
    pub source: PathBuf,
    /// 入力ファイルの種類
    pub kind: FileKind,
    /// 出力ディレクトリ（`<出力ルート>/<ベース名>`）
    pub output_dir: PathBuf,
    /// ワークブックから抽出したCSV（XLSXの場合のみ）
    pub extracted: Option<PathBuf>,
    /// 列を置換したCSV
    pub sanitized: PathBuf,
    /// 列変換の結果
    pub stats: RemapStats,
}

/// 対象外の拡張子のためスキップしたファイル
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub source: PathBuf,
    /// 小文字化した拡張子
    pub extension: String,
}

/// 処理に失敗したファイル
#[derive(Debug, Serialize)]
pub struct FailedFile {
    pub source: PathBuf,
    #[serde(serialize_with = "serialize_error")]
    pub error: RemapError,
}

fn serialize_error<S: Serializer>(error: &RemapError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// 1ファイルの処理結果
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Processed(FileReport),
    Skipped(SkippedFile),
}

/// 実行全体の集計
///
/// 各リストは入力ファイルの列挙順に並びます。
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub processed: Vec<FileReport>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
}

impl RunSummary {
    /// 失敗したファイルが無いか
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Processed(report) => self.processed.push(report),
            FileOutcome::Skipped(skipped) => self.skipped.push(skipped),
        }
    }
}

/// 入力ディレクトリ直下のファイルを列挙する
///
/// 拡張子を持つ通常ファイルのみを対象とし、サブディレクトリは走査しません。
/// 結果はファイル名の辞書順に並びます。
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, RemapError> {
    let read_error = |source: std::io::Error| RemapError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && path.extension().is_some() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// ファイル振り分けのファサード
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxremap::{Config, Dispatcher};
///
/// # fn main() -> Result<(), xlsxremap::RemapError> {
/// let dispatcher = Dispatcher::new(Config::from_env()?);
/// let summary = dispatcher.run()?;
/// for failed in &summary.failed {
///     eprintln!("{}: {}", failed.source.display(), failed.error);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Config,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 入力ディレクトリ全体を処理する
    ///
    /// # 処理フロー
    ///
    /// 1. 出力ルートディレクトリの作成
    /// 2. 入力ファイルの列挙（辞書順）
    /// 3. 出力先の衝突検出（列挙順で後のファイルを`OutputConflict`にする）
    /// 4. 各ファイルの処理（`parallel`が有効ならrayonで並列化）
    /// 5. 結果を列挙順に集計
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunSummary)` - 全ファイルを試行した場合。`ErrorPolicy::Continue`では
    ///   失敗したファイルも`failed`に含まれます
    /// * `Err(RemapError)` - 出力ルートの作成や列挙に失敗した場合、または
    ///   `ErrorPolicy::Halt`でいずれかのファイルが失敗した場合
    pub fn run(&self) -> Result<RunSummary, RemapError> {
        let lookup = self.config.lookup();
        if lookup.has_unmapped_values() {
            warn!(
                values = lookup.values().len(),
                overwrite = lookup.overwrite().len(),
                "VALUES has more entries than OVERWRITE; extra values map to DEFAULT"
            );
        }

        let output_dir = self.config.output_dir();
        fs::create_dir_all(output_dir).map_err(|source| RemapError::DirectoryCreate {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let files = discover_files(self.config.docs_dir())?;
        info!(
            dir = %self.config.docs_dir().display(),
            count = files.len(),
            "discovered input files"
        );
        let conflicts = self.find_output_conflicts(&files);

        let mut summary = RunSummary::default();
        match self.config.error_policy() {
            ErrorPolicy::Halt => {
                // 並列時にどのファイルのエラーが返るかは不定
                let outcomes: Vec<FileOutcome> = if self.config.is_parallel() {
                    files
                        .par_iter()
                        .zip(conflicts.par_iter())
                        .map(|(path, conflict)| self.process_unless_conflict(path, conflict))
                        .collect::<Result<_, _>>()?
                } else {
                    files
                        .iter()
                        .zip(&conflicts)
                        .map(|(path, conflict)| self.process_unless_conflict(path, conflict))
                        .collect::<Result<_, _>>()?
                };
                outcomes.into_iter().for_each(|o| summary.record(o));
            }
            ErrorPolicy::Continue => {
                let results: Vec<Result<FileOutcome, RemapError>> = if self.config.is_parallel() {
                    files
                        .par_iter()
                        .zip(conflicts.par_iter())
                        .map(|(path, conflict)| self.process_unless_conflict(path, conflict))
                        .collect()
                } else {
                    files
                        .iter()
                        .zip(&conflicts)
                        .map(|(path, conflict)| self.process_unless_conflict(path, conflict))
                        .collect()
                };

                for (path, result) in files.into_iter().zip(results) {
                    match result {
                        Ok(outcome) => summary.record(outcome),
                        Err(error) => {
                            warn!(file = %path.display(), "{}", error);
                            summary.failed.push(FailedFile {
                                source: path,
                                error,
                            });
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    /// 変換結果の出力先が重なるファイルを検出する
    ///
    /// 戻り値は`files`と同じ順で、衝突する場合は（出力先, 先に使う入力ファイル）です。
    /// 結果は列挙順だけで決まるため、並列処理でも同じファイルが処理されます。
    fn find_output_conflicts(&self, files: &[PathBuf]) -> Vec<Option<(PathBuf, PathBuf)>> {
        let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
        files
            .iter()
            .map(|path| {
                let target = self.sanitized_target(path)?;
                match claimed.get(&target) {
                    Some(first) => Some((target, (*first).clone())),
                    None => {
                        claimed.insert(target, path);
                        None
                    }
                }
            })
            .collect()
    }

    /// 変換結果の出力先（対象外の拡張子は`None`）
    fn sanitized_target(&self, path: &Path) -> Option<PathBuf> {
        let base = path.file_stem()?.to_string_lossy();
        let out_dir = self.config.output_dir().join(base.as_ref());
        match FileKind::from_path(path) {
            FileKind::Spreadsheet => Some(out_dir.join(format!("{}{}.csv", SANITIZED_PREFIX, base))),
            FileKind::Csv => Some(out_dir.join(format!(
                "{}{}",
                SANITIZED_PREFIX,
                path.file_name()?.to_string_lossy()
            ))),
            FileKind::Unsupported(_) => None,
        }
    }

    fn process_unless_conflict(
        &self,
        path: &Path,
        conflict: &Option<(PathBuf, PathBuf)>,
    ) -> Result<FileOutcome, RemapError> {
        match conflict {
            Some((target, first)) => Err(RemapError::OutputConflict {
                path: path.to_path_buf(),
                target: target.clone(),
                first: first.clone(),
            }),
            None => self.process_file(path),
        }
    }

    /// 1ファイルを処理する
    ///
    /// 出力ディレクトリ`<出力ルート>/<ベース名>`を作成してから、
    /// 小文字化した拡張子で振り分けます。
    ///
    /// - `.xlsx`: 最初のシートを`<ベース名>.csv`に抽出し、それを列変換
    /// - `.csv`: 入力ファイルを直接列変換
    /// - その他: スキップ（エラーではない）
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome, RemapError> {
        let base = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| RemapError::open(path, "path has no file name"))?;

        let out_dir = self.config.output_dir().join(&base);
        fs::create_dir_all(&out_dir).map_err(|source| RemapError::DirectoryCreate {
            path: out_dir.clone(),
            source,
        })?;

        let remapper = ColumnRemapper::from_config(&self.config);
        let kind = FileKind::from_path(path);

        let (extracted, sanitized, stats) = match &kind {
            FileKind::Spreadsheet => {
                info!(file = %path.display(), "converting workbook");
                let csv_path = out_dir.join(format!("{}.csv", base));
                extract_first_sheet_with(path, &csv_path, &self.config.security)?;
                let (sanitized, stats) = remapper.remap_file(&csv_path, &out_dir)?;
                (Some(csv_path), sanitized, stats)
            }
            FileKind::Csv => {
                info!(file = %path.display(), "sanitizing csv");
                let (sanitized, stats) = remapper.remap_file(path, &out_dir)?;
                (None, sanitized, stats)
            }
            FileKind::Unsupported(extension) => {
                info!("Skipping unsupported file {}", path.display());
                return Ok(FileOutcome::Skipped(SkippedFile {
                    source: path.to_path_buf(),
                    extension: extension.clone(),
                }));
            }
        };

        Ok(FileOutcome::Processed(FileReport {
            source: path.to_path_buf(),
            kind,
            output_dir: out_dir,
            extracted,
            sanitized,
            stats,
        }))
    }
}
