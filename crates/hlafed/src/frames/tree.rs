// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name-keyed reference frame tree.
//!
//! Frames point at their parent by name, so a tree can be assembled in any
//! order as frames are created locally or discovered from the federation.
//! [`RefFrameTree::validate`] checks the finished shape: exactly one root,
//! every parent present, no cycles.

use std::collections::{HashMap, HashSet};

use super::ref_frame::RefFrame;
use super::relative_state::FrameKinematics;
use crate::error::{Error, Result};

/// Collection of reference frames forming a single-rooted tree.
#[derive(Debug, Clone, Default)]
pub struct RefFrameTree {
    frames: HashMap<String, RefFrame>,
}

impl RefFrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new frame. Names are unique within a tree.
    pub fn add_frame(&mut self, frame: RefFrame) -> Result<()> {
        if self.frames.contains_key(&frame.name) {
            return Err(Error::DuplicateFrame(frame.name));
        }
        log::debug!(
            "[frames] add {} (parent '{}')",
            frame.name,
            frame.parent_name
        );
        self.frames.insert(frame.name.clone(), frame);
        Ok(())
    }

    /// Insert or replace a frame, e.g. with a reflected update.
    pub fn upsert_frame(&mut self, frame: RefFrame) {
        self.frames.insert(frame.name.clone(), frame);
    }

    pub fn remove_frame(&mut self, name: &str) -> Option<RefFrame> {
        self.frames.remove(name)
    }

    pub fn find(&self, name: &str) -> Option<&RefFrame> {
        self.frames.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut RefFrame> {
        self.frames.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The first root frame found, if any.
    pub fn root(&self) -> Option<&RefFrame> {
        self.frames.values().find(|f| f.is_root())
    }

    /// Names of `name` and all its ancestors, nearest first.
    ///
    /// Fails on a missing frame or parent, and on a parent cycle.
    pub fn path_to_root(&self, name: &str) -> Result<Vec<&str>> {
        let mut frame = self
            .frames
            .get(name)
            .ok_or_else(|| Error::FrameNotFound(name.to_string()))?;
        let mut path = vec![frame.name.as_str()];
        while !frame.is_root() {
            if path.len() > self.frames.len() {
                return Err(Error::NoTransformPath {
                    from: name.to_string(),
                    to: String::new(),
                });
            }
            frame = self
                .frames
                .get(&frame.parent_name)
                .ok_or_else(|| Error::FrameNotFound(frame.parent_name.clone()))?;
            path.push(frame.name.as_str());
        }
        Ok(path)
    }

    /// Check the tree shape: one root, all parents present, no cycles.
    pub fn validate(&self) -> Result<()> {
        let roots: Vec<&str> = self
            .frames
            .values()
            .filter(|f| f.is_root())
            .map(|f| f.name.as_str())
            .collect();
        if roots.len() != 1 {
            return Err(Error::Config(format!(
                "reference frame tree must have exactly one root, found {}",
                roots.len()
            )));
        }
        for name in self.frames.keys() {
            self.path_to_root(name)?;
        }
        Ok(())
    }

    /// Lowest frame that is an ancestor of (or equal to) both frames.
    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> Result<String> {
        let path_a = self.path_to_root(a)?;
        let path_b: HashSet<&str> = self.path_to_root(b)?.into_iter().collect();
        path_a
            .into_iter()
            .find(|name| path_b.contains(name))
            .map(str::to_string)
            .ok_or_else(|| Error::NoTransformPath {
                from: a.to_string(),
                to: b.to_string(),
            })
    }

    /// Kinematics of `name` relative to its ancestor `ancestor`.
    fn relative_to_ancestor(&self, name: &str, ancestor: &str) -> Result<FrameKinematics> {
        if name == ancestor {
            return Ok(FrameKinematics::identity());
        }
        let not_found = |n: &str| Error::FrameNotFound(n.to_string());
        let mut frame = self.frames.get(name).ok_or_else(|| not_found(name))?;
        let mut acc = frame.kinematics();
        let mut steps = 0;
        while frame.parent_name != ancestor {
            steps += 1;
            if steps > self.frames.len() || frame.is_root() {
                return Err(Error::NoTransformPath {
                    from: name.to_string(),
                    to: ancestor.to_string(),
                });
            }
            frame = self
                .frames
                .get(&frame.parent_name)
                .ok_or_else(|| not_found(&frame.parent_name))?;
            acc = frame.kinematics().compose(&acc);
        }
        Ok(acc)
    }

    /// Kinematics of frame `source` expressed in frame `express`.
    pub fn transform(&self, source: &str, express: &str) -> Result<FrameKinematics> {
        if source == express {
            if !self.contains(source) {
                return Err(Error::FrameNotFound(source.to_string()));
            }
            return Ok(FrameKinematics::identity());
        }
        let lca = self.lowest_common_ancestor(source, express)?;
        let source_in_lca = self.relative_to_ancestor(source, &lca)?;
        let express_in_lca = self.relative_to_ancestor(express, &lca)?;
        Ok(express_in_lca.inverse().compose(&source_in_lca))
    }

    /// Write the state of `source` relative to `express` into `out`.
    ///
    /// `out` becomes a frame named `source` whose parent is `express`. It is
    /// left untouched when no path exists.
    pub fn build_transform(&self, source: &str, express: &str, out: &mut RefFrame) -> Result<()> {
        let kinematics = self.transform(source, express)?;
        out.name = source.to_string();
        out.parent_name = express.to_string();
        out.set_kinematics(&kinematics);
        Ok(())
    }
}
