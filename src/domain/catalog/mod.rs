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

//! Static reference data: node pool classes and locations

pub mod location;
pub mod node_pool;

pub use self::location::{describe_location, list_locations, Location, DEFAULT_LOCATION};
pub use self::node_pool::{describe, list_pool_types, NodePoolConfiguration};
