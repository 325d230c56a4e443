// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! drumpi turns a Raspberry Pi into a dedicated drum sound engine: JACK for
//! audio, DrumGizmo for the samples, jack-plumbing to wire them together.
//!
//! Provisioning is a fixed list of convergent [`orchestrator::Step`]s run in
//! order by the [`orchestrator::Orchestrator`]. Re-running is always safe.

pub mod artifacts;
pub mod config;
pub mod device;
pub mod error;
pub mod kit;
pub mod orchestrator;
pub mod poll;
pub mod steps;
pub mod system;
