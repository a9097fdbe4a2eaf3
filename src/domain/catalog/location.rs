// Copyright 2025 JiangLong.
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

use crate::shared::error::{ProvisionError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub name: &'static str,
    pub display_name: &'static str,
}

pub const DEFAULT_LOCATION: &str = "eastus";

const LOCATIONS: &[Location] = &[
    Location {
        name: "eastus",
        display_name: "East US",
    },
    Location {
        name: "westus2",
        display_name: "West US 2",
    },
    Location {
        name: "northeurope",
        display_name: "North Europe",
    },
    Location {
        name: "westeurope",
        display_name: "West Europe",
    },
    Location {
        name: "southeastasia",
        display_name: "Southeast Asia",
    },
];

pub fn list_locations() -> &'static [Location] {
    LOCATIONS
}

pub fn describe_location(name: &str) -> Result<&'static Location> {
    LOCATIONS
        .iter()
        .find(|location| location.name == name)
        .ok_or_else(|| {
            ProvisionError::invalid_field("location", format!("unknown location '{}'", name))
        })
}
