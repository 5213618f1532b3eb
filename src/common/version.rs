// Copyright 2025 SieveDB Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Version information for SieveDB

use std::sync::OnceLock;

/// Major version number
pub const MAJOR: u32 = 0;

/// Minor version number
pub const MINOR: u32 = 1;

/// Patch version number
pub const PATCH: u32 = 0;

static VERSION: OnceLock<String> = OnceLock::new();

/// Returns the full version string
pub fn version() -> &'static str {
    VERSION.get_or_init(|| format!("{}.{}.{}", MAJOR, MINOR, PATCH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_format() {
        let v = version();
        assert_eq!(v.split('.').count(), 3);
        assert_eq!(v, format!("{}.{}.{}", MAJOR, MINOR, PATCH));
    }
}
