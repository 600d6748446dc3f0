//! A small dataset covering every node kind, and payloads built from its values.
//!
//! ```text
//! Dataset {
//!     Int32 v[10];                         v[i] = i
//!     Float64 t[2][3];                     t[i][j] = (3i + j) / 2
//!     String name[3];                      "alpha", "b\tc" (escaped), "xyz"; 8 chars max
//!     Structure { Int16 a[5]; Int16 b; } s[4];   a[j] = 10i + j, b = i
//!     Sequence { Float64 depth; Int32 id; } obs; 5 records, depth = 1.5r, id = 100 + r
//! } ds;
//! ```
use ncdap_client::memory::MemoryContent;
use ncdap_dds::{Dds, DdsBuilder};
use ncdap_types::{NcType, Values};

pub const DATASET: &str = "ds";
pub const NAME_MAX_LEN: usize = 8;
pub const OBS_RECORDS: usize = 5;

/// The metadata tree of the fixture dataset.
pub fn dataset() -> Dds {
    try_dataset().expect("fixture tree is well formed")
}

fn try_dataset() -> ncdap_dds::Result<Dds> {
    let mut b = DdsBuilder::new(DATASET);
    let root = b.root();
    b.primitive(root, "v", NcType::Int, &[10])?;
    b.primitive(root, "t", NcType::Double, &[2, 3])?;
    b.string(root, "name", &[3], NAME_MAX_LEN)?;
    let s = b.structure(root, "s", &[4])?;
    b.primitive(s, "a", NcType::Short, &[5])?;
    b.primitive(s, "b", NcType::Short, &[])?;
    let obs = b.sequence(root, "obs", Some(OBS_RECORDS))?;
    b.primitive(obs, "depth", NcType::Double, &[])?;
    b.primitive(obs, "id", NcType::Int, &[])?;
    Ok(b.build())
}

/// Wrap top-level variables into a dataset payload root.
pub fn in_dataset(vars: Vec<MemoryContent>) -> MemoryContent {
    MemoryContent::structure(DATASET, vars)
}

/// The whole dataset, as an unconstrained fetch returns it.
pub fn full_content() -> MemoryContent {
    in_dataset(vec![v(0..10), t(), name(), s(0..4), obs()])
}

pub fn v_value(i: usize) -> i32 {
    i as i32
}

/// `v` holding only the given indices, in order.
pub fn v(indices: impl IntoIterator<Item = usize>) -> MemoryContent {
    MemoryContent::values("v", Values::Int(indices.into_iter().map(v_value).collect()))
}

pub fn t() -> MemoryContent {
    MemoryContent::values(
        "t",
        Values::Double((0..6).map(|i| f64::from(i) / 2.0).collect()),
    )
}

/// Raw string values as the server sends them, escapes unexpanded.
pub const NAMES: [&str; 3] = ["alpha", "b\\tc", "xyz"];

pub fn name() -> MemoryContent {
    MemoryContent::values(
        "name",
        Values::String(NAMES.iter().map(ToString::to_string).collect()),
    )
}

/// `s` holding only the given instances, in order.
pub fn s(instances: impl IntoIterator<Item = usize>) -> MemoryContent {
    MemoryContent::array(
        "s",
        instances
            .into_iter()
            .map(|i| {
                let i = i as i16;
                MemoryContent::structure(
                    "s",
                    vec![
                        MemoryContent::values(
                            "a",
                            Values::Short((0..5).map(|j| 10 * i + j).collect()),
                        ),
                        MemoryContent::scalar("b", Values::Short(vec![i])),
                    ],
                )
            })
            .collect(),
    )
}

pub fn obs() -> MemoryContent {
    obs_records(OBS_RECORDS)
}

/// `obs` with only its first `n` records, as a server that ran short would send it.
pub fn obs_records(n: usize) -> MemoryContent {
    MemoryContent::sequence(
        "obs",
        (0..n)
            .map(|r| {
                MemoryContent::structure(
                    "obs",
                    vec![
                        MemoryContent::scalar("depth", Values::Double(vec![1.5 * r as f64])),
                        MemoryContent::scalar("id", Values::Int(vec![100 + r as i32])),
                    ],
                )
            })
            .collect(),
    )
}
