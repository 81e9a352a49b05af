//! Tree access on top of `quartz_nbt`.
//!
//! Structure containers, block entity state and entity state are all
//! [`NbtCompound`]s.  The crate's own lookups are strict about tag kinds;
//! the container format is not (sizes show up as int lists or int arrays,
//! palette indices as any integer width), so [`CompoundExt`] adds
//! `Option`-returning lookups that widen where that is lossless.

use std::io::Cursor;

pub use quartz_nbt::io::{Flavor, NbtIoError};
pub use quartz_nbt::{NbtCompound, NbtList, NbtTag};

/// Read one root compound in `flavor`.  Uncompressed input must end with
/// the root tag.
pub fn read_root(bytes: &[u8], flavor: Flavor) -> Result<NbtCompound, NbtIoError> {
    let mut cursor = Cursor::new(bytes);
    let (root, _name) = quartz_nbt::io::read_nbt(&mut cursor, flavor)?;
    if matches!(flavor, Flavor::Uncompressed) {
        let left = bytes.len() - cursor.position() as usize;
        if left > 0 {
            return Err(NbtIoError::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} trailing bytes after root tag", left),
            )));
        }
    }
    Ok(root)
}

/// Write `root` with an empty root name.
pub fn write_root(root: &NbtCompound, flavor: Flavor) -> Result<Vec<u8>, NbtIoError> {
    let mut out = Vec::new();
    quartz_nbt::io::write_nbt(&mut out, None, root, flavor)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Lenient lookups
// ---------------------------------------------------------------------------

pub fn as_i64(tag: &NbtTag) -> Option<i64> {
    match *tag {
        NbtTag::Byte(v) => Some(v as i64),
        NbtTag::Short(v) => Some(v as i64),
        NbtTag::Int(v) => Some(v as i64),
        NbtTag::Long(v) => Some(v),
        _ => None,
    }
}

pub fn as_f64(tag: &NbtTag) -> Option<f64> {
    match *tag {
        NbtTag::Float(v) => Some(v as f64),
        NbtTag::Double(v) => Some(v),
        _ => as_i64(tag).map(|v| v as f64),
    }
}

pub fn as_slice(tag: &NbtTag) -> Option<&[NbtTag]> {
    match tag {
        NbtTag::List(list) => Some(list.as_ref()),
        _ => None,
    }
}

pub fn as_compound(tag: &NbtTag) -> Option<&NbtCompound> {
    match tag {
        NbtTag::Compound(c) => Some(c),
        _ => None,
    }
}

pub trait CompoundExt {
    fn tag(&self, key: &str) -> Option<&NbtTag>;

    /// Remove `key`, keeping the order of the remaining entries.
    fn remove_key(&mut self, key: &str) -> Option<NbtTag>;

    /// Any integral tag whose value fits an `i32`.
    fn get_int(&self, key: &str) -> Option<i32> {
        self.tag(key)
            .and_then(as_i64)
            .and_then(|v| i32::try_from(v).ok())
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        match self.tag(key)? {
            NbtTag::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_list(&self, key: &str) -> Option<&[NbtTag]> {
        self.tag(key).and_then(as_slice)
    }

    fn get_compound(&self, key: &str) -> Option<&NbtCompound> {
        self.tag(key).and_then(as_compound)
    }
}

impl CompoundExt for NbtCompound {
    fn tag(&self, key: &str) -> Option<&NbtTag> {
        self.inner().get(key)
    }

    fn remove_key(&mut self, key: &str) -> Option<NbtTag> {
        self.inner_mut().shift_remove(key)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn list(items: Vec<NbtTag>) -> NbtTag {
    NbtTag::List(NbtList::from(items))
}

pub fn int_list(values: [i32; 3]) -> NbtTag {
    list(values.iter().map(|v| NbtTag::Int(*v)).collect())
}

pub fn double_list(values: [f64; 3]) -> NbtTag {
    list(values.iter().map(|v| NbtTag::Double(*v)).collect())
}
