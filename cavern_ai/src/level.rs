// The navigation level: box graph, zone tables and the live layout.
//
// Bundles the three pieces of shared navigation state every AI operation
// reads, so call sites take one `&Level` instead of threading the graph,
// tables and layout separately. Box flags are the only part that changes
// during play (through `graph_mut`); a flip-map event toggles `layout`.
//
// See also: `boxes.rs`, `zone.rs`, `sim.rs` which owns the `Level`.

use crate::boxes::BoxGraph;
use crate::error::LevelError;
use crate::types::{BoxId, ZoneId};
use crate::zone::{Layout, ZoneClass, ZoneTables};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Level {
    graph: BoxGraph,
    zones: ZoneTables,
    pub layout: Layout,
}

impl Level {
    /// Build a level, flood-filling its zone tables.
    pub fn new(graph: BoxGraph) -> Result<Level, LevelError> {
        let zones = ZoneTables::compute(&graph)?;
        Ok(Level {
            graph,
            zones,
            layout: Layout::Normal,
        })
    }

    /// Build a level from loader-provided zone tables.
    pub fn with_zones(graph: BoxGraph, zones: ZoneTables) -> Result<Level, LevelError> {
        if zones.box_count() != graph.len() {
            return Err(LevelError::ZoneTableLength {
                expected: graph.len(),
                actual: zones.box_count(),
            });
        }
        Ok(Level {
            graph,
            zones,
            layout: Layout::Normal,
        })
    }

    pub fn graph(&self) -> &BoxGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut BoxGraph {
        &mut self.graph
    }

    pub fn zones(&self) -> &ZoneTables {
        &self.zones
    }

    /// Zone of a box for `class` in the live layout.
    pub fn zone(&self, class: ZoneClass, id: BoxId) -> ZoneId {
        self.zones.zone(class, self.layout, id)
    }

    pub fn flip(&mut self) {
        self.layout = self.layout.toggled();
    }
}
