//! Railyard - rail network topology for a voxel colony sim
//!
//! Defines track-piece geometry, merges overlapping pieces through a rule
//! table, maintains the adjacency graph between placed instances, and
//! drives the interactive path-laying tool. Mesh generation, job
//! scheduling and voxel storage are external collaborators reached through
//! the message types in [`rail::messages`] and the [`voxel::VoxelWorld`]
//! resource.

use bevy::app::PluginGroupBuilder;
use bevy::prelude::*;

pub mod rail;
pub mod voxel;

pub use rail::RailPlugin;

/// Plugin group for the whole engine (headless-compatible).
/// Use this for tests and for embedding into a game app.
pub struct LogicPlugins;

impl PluginGroup for LogicPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>().add(RailPlugin)
    }
}
