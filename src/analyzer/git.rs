//! Gitリポジトリとの対話を担当するモジュール
//!
//! このモジュールは、libgit2を使用してGitリポジトリからコミット履歴を取得し、
//! リポジトリの基本情報とコミットごとの変更統計を提供します。

use super::commit::{ChangeStats, Commit};
use super::error::IngestionError;
use chrono::{DateTime, Utc};
use git2::{Repository, Sort};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// コミット取得時の絞り込み条件
///
/// # フィールド
///
/// - `author`: 作成者の正規表現（`名前 <メール>`に対して照合）
/// - `branch`: 履歴をたどる起点のブランチまたはリビジョン（省略時はHEAD）
/// - `since`, `until`: 作成日時（author date）の範囲（両端を含む）
/// - `include_merges`: マージコミットを含めるかどうか
/// - `max_commits`: 最新から数えて保持する最大件数
#[derive(Debug, Clone)]
pub struct CommitFilter {
    pub author: Option<String>,
    pub branch: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub include_merges: bool,
    pub max_commits: Option<usize>,
}

impl Default for CommitFilter {
    fn default() -> Self {
        Self {
            author: None,
            branch: None,
            since: None,
            until: None,
            include_merges: true,
            max_commits: None,
        }
    }
}

/// リポジトリの基本情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoInfo {
    pub name: String,
    pub branch: String,
    pub last_commit: Option<LastCommit>,
}

/// 最新コミットの短縮ハッシュと日時
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastCommit {
    pub hash: String,
    pub date: DateTime<Utc>,
}

/// Gitリポジトリへのアクセスを管理する構造体
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// 指定されたパスのGitリポジトリをオープンします
    ///
    /// # エラー
    ///
    /// 指定されたパスがGitリポジトリでない場合は
    /// `IngestionError::InvalidRepository`を返します。
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestionError> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .map_err(|_| IngestionError::InvalidRepository(path.display().to_string()))?;
        Ok(Self { repo })
    }

    /// リポジトリ名・現在のブランチ・最新コミットを取得します
    ///
    /// `remote.origin.url`があればその末尾（`.git`を除く）を、
    /// なければ作業ディレクトリ名をリポジトリ名とします。
    pub fn info(&self) -> RepoInfo {
        let name = self
            .remote_name()
            .or_else(|| self.directory_name())
            .unwrap_or_else(|| "unknown".to_string());

        let branch = match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().unwrap_or("HEAD").to_string(),
            Ok(_) => "HEAD".to_string(),
            // まだコミットのないブランチ
            Err(_) => self
                .repo
                .find_reference("HEAD")
                .ok()
                .and_then(|r| r.symbolic_target().map(str::to_string))
                .map(|target| target.trim_start_matches("refs/heads/").to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };

        let last_commit = self.repo.head().ok().and_then(|head| {
            let commit = head.peel_to_commit().ok()?;
            let hash = commit.id().to_string();
            Some(LastCommit {
                hash: hash[..8.min(hash.len())].to_string(),
                date: DateTime::from_timestamp(commit.time().seconds(), 0)?,
            })
        });

        RepoInfo {
            name,
            branch,
            last_commit,
        }
    }

    fn remote_name(&self) -> Option<String> {
        let config = self.repo.config().ok()?;
        let url = config.get_string("remote.origin.url").ok()?;
        let base = url.trim_end_matches('/').rsplit(['/', ':']).next()?;
        let name = base.strip_suffix(".git").unwrap_or(base);
        (!name.is_empty()).then(|| name.to_string())
    }

    fn directory_name(&self) -> Option<String> {
        let dir = self.repo.workdir().unwrap_or_else(|| self.repo.path());
        dir.canonicalize()
            .ok()?
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }

    /// リポジトリ設定の`user.name`を返します
    pub fn configured_user(&self) -> Option<String> {
        self.repo.config().ok()?.get_string("user.name").ok()
    }

    /// 条件に合うコミットを時系列順（古い順）に取得します
    ///
    /// 一致するコミットがない場合やHEADにコミットがない場合は
    /// 空のベクターを返します。
    ///
    /// # エラー
    ///
    /// 以下の場合にエラーを返します：
    /// - 作成者のパターンが正規表現として不正
    /// - 指定されたブランチが存在しない
    /// - コミット履歴の走査に失敗
    pub fn get_commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>, IngestionError> {
        let author_pattern = filter
            .author
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| IngestionError::InvalidPattern(e.to_string()))?;

        let mut revwalk = self.repo.revwalk()?;
        match filter.branch.as_deref() {
            Some(branch) => {
                let target = self
                    .repo
                    .revparse_single(branch)
                    .and_then(|obj| obj.peel_to_commit())
                    .map_err(|_| IngestionError::UnknownRevision(branch.to_string()))?;
                revwalk.push(target.id())?;
            }
            None => {
                if self.repo.head().is_err() {
                    tracing::debug!("HEAD has no commits yet");
                    return Ok(Vec::new());
                }
                revwalk.push_head()?;
            }
        }
        revwalk.set_sorting(Sort::TIME)?;

        let since = filter.since.map(|dt| dt.timestamp());
        let until = filter.until.map(|dt| dt.timestamp());

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            let author = commit.author();
            let timestamp = author.when().seconds();

            if since.is_some_and(|s| timestamp < s) || until.is_some_and(|u| timestamp > u) {
                continue;
            }

            if !filter.include_merges && commit.parent_count() > 1 {
                continue;
            }

            let author_name = author.name().unwrap_or("unknown").to_string();
            let author_email = author.email().unwrap_or("").to_string();

            if let Some(pattern) = &author_pattern {
                let identity = format!("{} <{}>", author_name, author_email);
                if !pattern.is_match(&identity) {
                    continue;
                }
            }

            commits.push(Commit {
                hash: commit.id().to_string(),
                author_name,
                author_email,
                timestamp,
                message: commit.summary().unwrap_or("").to_string(),
            });
        }

        commits.sort_by_key(|c| c.timestamp);

        if let Some(max) = filter.max_commits {
            if commits.len() > max {
                tracing::debug!(limit = max, total = commits.len(), "keeping most recent commits");
                commits.drain(..commits.len() - max);
            }
        }

        tracing::debug!(count = commits.len(), "collected commits");
        Ok(commits)
    }

    /// 各コミットの変更統計をまとめて取得します
    ///
    /// 統計を計算できなかったコミットは警告を出して結果から除外し、
    /// 残りのコミットの処理を続けます。
    pub fn change_stats(&self, commits: &[Commit]) -> IndexMap<String, ChangeStats> {
        let mut stats = IndexMap::with_capacity(commits.len());
        for commit in commits {
            match self.commit_stats(&commit.hash) {
                Ok(s) => {
                    stats.insert(commit.hash.clone(), s);
                }
                Err(e) => {
                    tracing::warn!(
                        hash = %commit.short_hash(),
                        error = %e,
                        "skipping change stats"
                    );
                }
            }
        }
        stats
    }

    fn commit_stats(&self, hash: &str) -> Result<ChangeStats, IngestionError> {
        let commit = self.repo.find_commit(git2::Oid::from_str(hash)?)?;
        let tree = commit.tree()?;
        let parent_tree = commit.parent(0).ok().and_then(|parent| parent.tree().ok());

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let stats = diff.stats()?;

        Ok(ChangeStats {
            files_changed: stats.files_changed(),
            insertions: stats.insertions(),
            deletions: stats.deletions(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use std::fs;
    use tempfile::TempDir;

    const BASE: i64 = 1_704_067_200;

    struct Fixture {
        dir: TempDir,
        repo: Repository,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Repository::init(dir.path()).unwrap();
            Self { dir, repo }
        }

        fn commit(&self, author: &str, offset: i64, file: &str, content: &str) -> git2::Oid {
            fs::write(self.dir.path().join(file), content).unwrap();

            let mut index = self.repo.index().unwrap();
            index.add_path(Path::new(file)).unwrap();
            index.write().unwrap();
            let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

            let email = format!("{}@example.com", author.to_lowercase());
            let sig = Signature::new(author, &email, &Time::new(BASE + offset, 0)).unwrap();
            let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
            let parents: Vec<&git2::Commit> = parent.iter().collect();

            let message = format!("{} at {}", file, offset);
            self.repo
                .commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)
                .unwrap()
        }

        /// HEADと`side`を親に持つマージコミットを作成します
        fn merge(&self, side: git2::Oid, offset: i64) -> git2::Oid {
            let sig = Signature::new("Alice", "alice@example.com", &Time::new(BASE + offset, 0))
                .unwrap();
            let head = self.repo.head().unwrap().peel_to_commit().unwrap();
            let side = self.repo.find_commit(side).unwrap();
            let tree = head.tree().unwrap();
            self.repo
                .commit(Some("HEAD"), &sig, &sig, "merge side", &tree, &[&head, &side])
                .unwrap()
        }

        /// HEADを動かさずに`parent`の子コミットを作成します
        fn side_commit(&self, parent: git2::Oid, offset: i64) -> git2::Oid {
            let sig =
                Signature::new("Bob", "bob@example.com", &Time::new(BASE + offset, 0)).unwrap();
            let parent = self.repo.find_commit(parent).unwrap();
            let tree = parent.tree().unwrap();
            self.repo
                .commit(None, &sig, &sig, "side work", &tree, &[&parent])
                .unwrap()
        }

        fn git(&self) -> GitRepository {
            GitRepository::open(self.dir.path()).unwrap()
        }
    }

    #[test]
    fn test_open_invalid_repository() {
        let dir = TempDir::new().unwrap();
        let result = GitRepository::open(dir.path().join("missing"));
        assert!(matches!(result, Err(IngestionError::InvalidRepository(_))));
    }

    #[test]
    fn test_empty_repository_has_no_commits() {
        let fixture = Fixture::new();
        let commits = fixture.git().get_commits(&CommitFilter::default()).unwrap();
        assert!(commits.is_empty());

        let info = fixture.git().info();
        assert!(info.last_commit.is_none());
    }

    #[test]
    fn test_get_commits_sorted_and_filtered() {
        let fixture = Fixture::new();
        fixture.commit("Alice", 0, "a.txt", "one\n");
        fixture.commit("Bob", 3600, "b.txt", "two\n");
        fixture.commit("Alice", 7200, "a.txt", "one\nthree\n");

        let git = fixture.git();
        let all = git.get_commits(&CommitFilter::default()).unwrap();
        let timestamps: Vec<i64> = all.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![BASE, BASE + 3600, BASE + 7200]);
        assert_eq!(all[0].message, "a.txt at 0");
        assert_eq!(all[1].author_email, "bob@example.com");

        let alice = git
            .get_commits(&CommitFilter {
                author: Some("^Alice".to_string()),
                ..CommitFilter::default()
            })
            .unwrap();
        assert_eq!(alice.len(), 2);

        let by_email = git
            .get_commits(&CommitFilter {
                author: Some("bob@".to_string()),
                ..CommitFilter::default()
            })
            .unwrap();
        assert_eq!(by_email.len(), 1);

        let window = git
            .get_commits(&CommitFilter {
                since: DateTime::from_timestamp(BASE + 1, 0),
                until: DateTime::from_timestamp(BASE + 3600, 0),
                ..CommitFilter::default()
            })
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].author_name, "Bob");

        let recent = git
            .get_commits(&CommitFilter {
                max_commits: Some(2),
                ..CommitFilter::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, BASE + 3600);
    }

    #[test]
    fn test_invalid_author_pattern() {
        let fixture = Fixture::new();
        fixture.commit("Alice", 0, "a.txt", "one\n");

        let result = fixture.git().get_commits(&CommitFilter {
            author: Some("(unclosed".to_string()),
            ..CommitFilter::default()
        });
        assert!(matches!(result, Err(IngestionError::InvalidPattern(_))));
    }

    #[test]
    fn test_unknown_branch() {
        let fixture = Fixture::new();
        fixture.commit("Alice", 0, "a.txt", "one\n");

        let result = fixture.git().get_commits(&CommitFilter {
            branch: Some("no-such-branch".to_string()),
            ..CommitFilter::default()
        });
        assert!(matches!(result, Err(IngestionError::UnknownRevision(_))));
    }

    #[test]
    fn test_change_stats() {
        let fixture = Fixture::new();
        fixture.commit("Alice", 0, "a.txt", "one\ntwo\n");
        fixture.commit("Alice", 60, "a.txt", "one\n2\nthree\n");

        let git = fixture.git();
        let mut commits = git.get_commits(&CommitFilter::default()).unwrap();
        commits.push(Commit {
            hash: "not-a-hash".to_string(),
            ..commits[0].clone()
        });

        let stats = git.change_stats(&commits);

        assert_eq!(stats.len(), 2);
        let first = stats[&commits[0].hash];
        assert_eq!(first.files_changed, 1);
        assert_eq!(first.insertions, 2);
        let second = stats[&commits[1].hash];
        assert_eq!(second.insertions, 2);
        assert_eq!(second.deletions, 1);
        assert!(!stats.contains_key("not-a-hash"));
    }

    #[test]
    fn test_merge_commits() {
        let fixture = Fixture::new();
        let root = fixture.commit("Alice", 0, "a.txt", "one\n");
        let side = fixture.side_commit(root, 600);
        fixture.commit("Alice", 1200, "b.txt", "two\n");
        let merge = fixture.merge(side, 1800);

        let git = fixture.git();
        let all = git.get_commits(&CommitFilter::default()).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().any(|c| c.hash == merge.to_string()));

        let without_merges = git
            .get_commits(&CommitFilter {
                include_merges: false,
                ..CommitFilter::default()
            })
            .unwrap();
        assert_eq!(without_merges.len(), 3);
        assert!(without_merges.iter().all(|c| c.hash != merge.to_string()));
        assert!(without_merges.iter().any(|c| c.hash == side.to_string()));
    }

    #[test]
    fn test_date_bounds_use_author_date() {
        let fixture = Fixture::new();
        fixture.commit("Alice", 0, "a.txt", "one\n");

        // 作成日時は BASE、コミット日時は1日後
        let author = Signature::new("Bob", "bob@example.com", &Time::new(BASE, 0)).unwrap();
        let committer =
            Signature::new("Bob", "bob@example.com", &Time::new(BASE + 86_400, 0)).unwrap();
        let head = fixture.repo.head().unwrap().peel_to_commit().unwrap();
        let tree = head.tree().unwrap();
        fixture
            .repo
            .commit(Some("HEAD"), &author, &committer, "rebased", &tree, &[&head])
            .unwrap();

        let commits = fixture
            .git()
            .get_commits(&CommitFilter {
                until: DateTime::from_timestamp(BASE + 60, 0),
                ..CommitFilter::default()
            })
            .unwrap();
        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|c| c.timestamp == BASE));
    }

    #[test]
    fn test_configured_user() {
        let fixture = Fixture::new();
        fixture
            .repo
            .config()
            .unwrap()
            .set_str("user.name", "Jane Doe")
            .unwrap();

        assert_eq!(fixture.git().configured_user().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_repo_info() {
        let fixture = Fixture::new();
        let oid = fixture.commit("Alice", 0, "a.txt", "one\n");

        let info = fixture.git().info();
        let last = info.last_commit.unwrap();
        assert_eq!(last.hash, oid.to_string()[..8]);
        assert_eq!(last.date.timestamp(), BASE);

        let expected = fixture
            .dir
            .path()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(info.name, expected);

        fixture
            .repo
            .remote("origin", "git@github.com:someone/worktime-demo.git")
            .unwrap();
        assert_eq!(fixture.git().info().name, "worktime-demo");
    }
}
