// Copyright (c) 2021, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Buffered output file that is only rewritten when its content changed.
/// Generators write into the in-memory buffer through [`fmt::Write`]; the
/// bytes hit the disk on [`FileUpdate::commit`].
pub struct FileUpdate
{
    path: PathBuf,
    buffer: String
}

impl FileUpdate
{
    pub fn new<P: Into<PathBuf>>(path: P) -> FileUpdate
    {
        FileUpdate {
            path: path.into(),
            buffer: String::new()
        }
    }

    pub fn push(&mut self, text: &str)
    {
        self.buffer.push_str(text);
    }

    /// Compare against the existing file and rewrite it only when different,
    /// creating parent directories on demand. Returns true if the file was
    /// written.
    pub fn commit(self) -> std::io::Result<bool>
    {
        if let Ok(existing) = std::fs::read(&self.path) {
            if existing == self.buffer.as_bytes() {
                return Ok(false);
            }
        }
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, self.buffer.as_bytes())?;
        Ok(true)
    }
}

impl fmt::Write for FileUpdate
{
    fn write_str(&mut self, s: &str) -> fmt::Result
    {
        self.buffer.push_str(s);
        Ok(())
    }
}

/// Path of `target` relative to the directory `base`, with forward slashes
/// so it can be pasted into generated `#include` statements.
pub fn relative_path(target: &Path, base: &Path) -> String
{
    let target_components: Vec<Component> = target.components().collect();
    let base_components: Vec<Component> = base.components().collect();
    let mut common = 0;
    while common < target_components.len()
        && common < base_components.len()
        && target_components[common] == base_components[common]
    {
        common += 1;
    }
    let mut parts: Vec<String> = Vec::new();
    for _ in common..base_components.len() {
        parts.push("..".into());
    }
    for component in &target_components[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests
{
    use std::fmt::Write;

    use super::*;

    fn temp_file(name: &str) -> PathBuf
    {
        let dir = std::env::temp_dir().join("sic-write-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn write_if_different()
    {
        let path = temp_file("write_if_different.h");
        let _ = std::fs::remove_file(&path);

        let mut file = FileUpdate::new(&path);
        write!(file, "#pragma once\n").unwrap();
        assert!(file.commit().unwrap());

        // Identical content: no rewrite.
        let mut file = FileUpdate::new(&path);
        write!(file, "#pragma once\n").unwrap();
        assert!(!file.commit().unwrap());

        // Changed content: rewritten.
        let mut file = FileUpdate::new(&path);
        write!(file, "#pragma once\n#define A 1\n").unwrap();
        assert!(file.commit().unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#pragma once\n#define A 1\n");
    }

    #[test]
    fn creates_parent_directories()
    {
        let dir = temp_file("nested");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("a/b/out.hlsl");
        let mut file = FileUpdate::new(&path);
        write!(file, "// generated\n").unwrap();
        assert!(file.commit().unwrap());
        assert!(path.exists());
    }

    #[test]
    fn relative_paths()
    {
        assert_eq!(
            relative_path(Path::new("/out/structs/Light.hlsl"), Path::new("/out/inputgroups/Fwd")),
            "../../structs/Light.hlsl"
        );
        assert_eq!(relative_path(Path::new("/out/a.hlsl"), Path::new("/out")), "a.hlsl");
    }
}
