// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

/// Environment variables consulted for the invoking user, in priority order.
const IDENTITY_VARS: [&str; 3] = ["SUDO_USER", "USER", "LOGNAME"];

/// Resolves the user who invoked drumpi.
///
/// Priority:
/// 1. SUDO_USER (drumpi is normally launched as `sudo drumpi` by the operating user)
/// 2. USER
/// 3. LOGNAME
///
/// Empty values are skipped. Returns None if none of them are set.
pub fn invoking_user() -> Option<String> {
    IDENTITY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}
