// This file is part of pol_spec_scan.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! # Polarization Scan
//!
//! This library drives one or two rotation stages holding the polarizers and
//! a spectrometer through a planned sequence of angles. A run ends with a
//! validated spectrum at every angle or with no data at all.
pub mod acquisition;
pub mod application;
pub mod config;
pub mod constants;
pub mod device;
pub mod enums;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod mock;
pub mod motion;
pub mod utility;
