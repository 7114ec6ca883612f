//! Siegeworks: destructible siege structures.
//!
//! Player-built walls, squares, slabs and triangles of wood or stone soak up
//! cannon fire.  When a structure's health runs out it is sliced into debris
//! by random cutting planes; each piece inherits volume-scaled mass and its
//! own health, and can break again until it reaches the lineage's split-level
//! ceiling.
//!
//! The core ([`world::DestructionWorld`] and everything beneath it) is plain
//! Rust over Bevy math types.  [`plugin::DestructionPlugin`] mirrors it into
//! Rapier2D bodies.

pub mod cannon;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod fragment;
pub mod gameflow;
pub mod geometry;
pub mod health;
pub mod phase;
pub mod placement;
pub mod plugin;
pub mod scheduler;
pub mod slicing;
pub mod solid;
pub mod solid_rendering;
pub mod world;
