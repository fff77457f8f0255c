use crate::error::EventError;
use crate::message::{Delta, Snapshot};
use crate::types::{Pencil, Pencils, Point, Stroke, StrokeId};

/// Authoritative board state. Only the server task owns one.
#[derive(Debug, Default)]
pub struct SessionState {
    pencils: Pencils,
    strokes: Vec<Stroke>,
    stroke_id_source: StrokeId,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pencils(&self) -> &Pencils {
        &self.pencils
    }

    pub fn pencil(&self, username: &str) -> Option<&Pencil> {
        self.pencils.get(username)
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke(&self, stroke_id: StrokeId) -> Option<&Stroke> {
        stroke_index(&self.strokes, stroke_id).map(|index| &self.strokes[index])
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            lines: self.strokes.clone(),
            pencils: self.pencils.clone(),
        }
    }

    /// Moves (or creates) the pencil of `username`, extending its current stroke.
    pub fn move_pencil(&mut self, username: &str, position: Point) -> Delta {
        let mut strokes = Vec::new();

        match self.pencils.get_mut(username) {
            Some(pencil) => {
                pencil.position = position;
                if let Some(stroke_id) = pencil.current_line {
                    match stroke_index(&self.strokes, stroke_id) {
                        Some(index) => {
                            let stroke = &mut self.strokes[index];
                            stroke.add_point(position);
                            strokes.push(stroke.clone());
                        }
                        None => {
                            log::warn!(
                                "Pencil {} referenced missing stroke {}",
                                username,
                                stroke_id
                            );
                            pencil.current_line = None;
                        }
                    }
                }
            }
            None => {
                log::info!("Pencil {} joined", username);
                self.pencils.insert(
                    username.to_owned(),
                    Pencil::new(position, username.to_owned()),
                );
            }
        }

        self.delta(strokes)
    }

    pub fn start_stroke(
        &mut self,
        username: &str,
        position: Point,
        color: String,
    ) -> Result<Delta, EventError> {
        if !self.pencils.contains_key(username) {
            return Err(EventError::UnknownPencil(username.to_owned()));
        }

        let stroke = Stroke::new(self.new_stroke_id(), position, color);
        if let Some(pencil) = self.pencils.get_mut(username) {
            pencil.current_line = Some(stroke.id);
        }
        log::debug!("Stroke {} started by {}", stroke.id, username);
        self.strokes.push(stroke.clone());

        Ok(self.delta(vec![stroke]))
    }

    pub fn end_stroke(&mut self, username: &str) -> Result<(), EventError> {
        let pencil = self
            .pencils
            .get_mut(username)
            .ok_or_else(|| EventError::UnknownPencil(username.to_owned()))?;
        pencil.current_line = None;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        for pencil in self.pencils.values_mut() {
            pencil.current_line = None;
        }
    }

    /// Removes the pencil of `username`; leaving twice is harmless.
    pub fn leave(&mut self, username: &str) -> Delta {
        if self.pencils.remove(username).is_some() {
            log::info!("Pencil {} left", username);
        }
        self.delta(Vec::new())
    }

    fn delta(&self, strokes: Vec<Stroke>) -> Delta {
        Delta {
            strokes,
            pencils: self.pencils.clone(),
        }
    }

    fn new_stroke_id(&mut self) -> StrokeId {
        let id = self.stroke_id_source;
        self.stroke_id_source += 1;
        id
    }
}

// Ids only grow and strokes are only removed all at once, so `strokes` stays sorted by id.
fn stroke_index(strokes: &[Stroke], stroke_id: StrokeId) -> Option<usize> {
    strokes
        .binary_search_by_key(&stroke_id, |stroke| stroke.id)
        .ok()
}
