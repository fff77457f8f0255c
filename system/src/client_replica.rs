use std::collections::HashSet;

use crate::message::{Delta, ServerEvent, Snapshot};
use crate::types::{Pencils, Stroke, StrokeId};

/// Client-side mirror of the board, fed by server deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientReplica {
    strokes: Vec<Stroke>,
    pencils: Pencils,
}

impl ClientReplica {
    pub fn new(snapshot: Snapshot) -> Self {
        log::debug!(
            "ClientReplica created with {} strokes and {} pencils",
            snapshot.lines.len(),
            snapshot.pencils.len()
        );
        Self {
            strokes: snapshot.lines,
            pencils: snapshot.pencils,
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn pencils(&self) -> &Pencils {
        &self.pencils
    }

    pub fn stroke(&self, stroke_id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|stroke| stroke.id == stroke_id)
    }

    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Update(delta) => self.apply_update(delta),
            ServerEvent::Clear => self.apply_clear(),
        }
    }

    /// Pencils are replaced wholesale; any incoming stroke supersedes the
    /// local stroke with the same id.
    pub fn apply_update(&mut self, delta: Delta) {
        let incoming: HashSet<StrokeId> = delta.strokes.iter().map(|stroke| stroke.id).collect();
        self.strokes.retain(|stroke| !incoming.contains(&stroke.id));
        self.strokes.extend(delta.strokes);
        self.pencils = delta.pencils;
    }

    pub fn apply_clear(&mut self) {
        self.strokes.clear();
    }
}

impl From<Snapshot> for ClientReplica {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot)
    }
}
