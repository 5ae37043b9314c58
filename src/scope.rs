/// Per-directory traversal state: the track counter and the artist accumulator.
///
/// Scopes live on a [`ScopeStack`] indexed by traversal depth, so that leaving a subdirectory
/// resumes the parent's counter and sibling directories never share one.
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryScope {
    path: PathBuf,
    track_counter: u32,
    artists: Vec<String>,
}

impl DirectoryScope {
    pub fn enter(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            track_counter: 0,
            artists: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Increment and return the 1-based track number.
    pub fn next_track(&mut self) -> u32 {
        self.track_counter += 1;
        self.track_counter
    }

    /// True until the first track of this directory has been handed out.
    pub fn at_boundary(&self) -> bool {
        self.track_counter == 0
    }

    pub fn track_counter(&self) -> u32 {
        self.track_counter
    }

    pub fn add_artist(&mut self, artist: &str) {
        if !artist.is_empty() && !self.artists.iter().any(|a| a == artist) {
            self.artists.push(artist.to_string());
        }
    }

    /// Distinct normalized artists in the order they were first seen.
    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    pub fn looks_like_compilation(&self) -> bool {
        self.artists.len() > 1
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<DirectoryScope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a directory found at `depth` (0 for the traversal root). Scopes of directories that
    /// were left are popped and returned so their summary can be reported.
    pub fn enter(&mut self, path: &Path, depth: usize) -> Vec<DirectoryScope> {
        let left = self.leave_to(depth);
        self.scopes.push(DirectoryScope::enter(path));
        left
    }

    /// Pop every scope deeper than `depth`.
    pub fn leave_to(&mut self, depth: usize) -> Vec<DirectoryScope> {
        let mut left = Vec::new();
        while self.scopes.len() > depth {
            if let Some(scope) = self.scopes.pop() {
                left.push(scope);
            }
        }
        left
    }

    /// The scope owning a file found at `depth`, i.e. its parent directory's scope.
    pub fn for_file(&mut self, depth: usize) -> Option<&mut DirectoryScope> {
        if depth == 0 || depth > self.scopes.len() {
            return None;
        }
        self.scopes.get_mut(depth - 1)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
