//! The builder: turns an ascending, duplicate-free key set and its values into the serialized
//! bitmap-trie buffer that [`crate::Reader`] reads.

use crate::format::{check_width, encode_le, Error, Header};
use crate::value::FixedWidthValue;

/// Content of one trie node while it is still being assembled. Discarded once [`Builder::dump`]
/// has emitted its bytes.
enum LayerKind {
    /// Child layer indices, in ascending slice order.
    Branch(Vec<u32>),
    /// Concatenated `value_bytes`-byte values, in ascending slice order.
    Leaf(Vec<u8>),
}

struct LayerData {
    bitmask: u64,
    kind: LayerKind,
}

impl LayerData {
    /// Number of children (branch) or values (leaf) this layer currently holds — equal to
    /// `popcount(bitmask)` by construction.
    fn item_count(&self) -> usize {
        match &self.kind {
            LayerKind::Branch(children) => children.len(),
            LayerKind::Leaf(values) => values.len(),
        }
    }
}

/// Builds [`crate::Reader`]-compatible byte buffers from ascending `(key, value)` pairs.
///
/// Construct with [`Builder::new`], giving the bitmask width and the value width the whole build
/// will share; then call [`Builder::dump`] or [`Builder::dump_bytes`].
#[derive(Debug, Clone, Copy)]
pub struct Builder {
    bitmask_bytes: u8,
    value_bytes: u8,
}

impl Builder {
    /// Creates a builder that lays out trie nodes with a `bitmask_bytes`-byte bitmask (fan-out
    /// `8·bitmask_bytes`) and emits `value_bytes`-byte leaf values.
    ///
    /// Both widths must be one of 1, 2, 4, 8; otherwise returns [`Error::InvalidWidth`].
    pub fn new(bitmask_bytes: u8, value_bytes: u8) -> Result<Self, Error> {
        check_width(bitmask_bytes)?;
        check_width(value_bytes)?;
        Ok(Self { bitmask_bytes, value_bytes })
    }

    /// Bitmask width this builder was configured with, in bytes.
    pub fn bitmask_bytes(&self) -> u8 { self.bitmask_bytes }

    /// Value width this builder was configured with, in bytes.
    pub fn value_bytes(&self) -> u8 { self.value_bytes }

    /// Builds a buffer mapping each `keys[i]` to `values[i]`.
    ///
    /// `keys` must be strictly ascending (checked; see [`Error::KeyOrderViolation`]).
    /// `V::WIDTH` must equal the configured value width (checked; see
    /// [`Error::ValueWidthMismatch`]).
    pub fn dump<V: FixedWidthValue>(&self, keys: &[u64], values: &[V]) -> Result<Vec<u8>, Error> {
        if V::WIDTH != self.value_bytes {
            return Err(Error::ValueWidthMismatch { expected: self.value_bytes, got: V::WIDTH as usize });
        }
        assert_eq!(keys.len(), values.len(), "keys and values must have the same length");
        let mut flat = Vec::with_capacity(values.len() * self.value_bytes as usize);
        for &v in values {
            v.write_le(&mut flat);
        }
        self.dump_bytes(keys, &flat)
    }

    /// Builds a buffer mapping each `keys[i]` to the `value_bytes`-byte value at
    /// `values[i*value_bytes .. (i+1)*value_bytes]`.
    pub fn dump_bytes(&self, keys: &[u64], values: &[u8]) -> Result<Vec<u8>, Error> {
        let w = self.value_bytes as usize;
        assert_eq!(values.len(), keys.len() * w, "values must hold exactly keys.len() * value_bytes bytes");

        if keys.is_empty() {
            return Ok(Vec::new());
        }
        for pair in keys.windows(2) {
            if pair[0] >= pair[1] {
                return Err(Error::KeyOrderViolation);
            }
        }

        let fan_out = 8u32 * self.bitmask_bytes as u32;
        let s = fan_out.trailing_zeros() as u8;
        let levels = levels_for(keys[keys.len() - 1], s);

        let layers = build_layers(keys, values, w, levels, s);
        let pointer_bytes = choose_pointer_bytes(&layers, self.bitmask_bytes, self.value_bytes)?;

        Ok(emit(&layers, Header {
            levels,
            bitmask_bytes: self.bitmask_bytes,
            pointer_bytes,
            value_bytes: self.value_bytes,
        }))
    }
}

/// Smallest positive `L` such that `max_key >> (L * s) == 0`.
fn levels_for(max_key: u64, s: u8) -> u8 {
    let mut levels: u32 = 1;
    while shr_or_zero(max_key, levels * s as u32) != 0 {
        levels += 1;
    }
    levels as u8
}

#[inline] fn shr_or_zero(v: u64, shift: u32) -> u64 {
    if shift >= 64 { 0 } else { v >> shift }
}

/// Runs the level-by-level trie construction described in the spec: for each depth from the
/// root (`levels - 1`) down to the leaves (`0`), keys are walked in ascending order and either
/// reuse the most-recently-created child of their current layer, or create a new one.
///
/// Returns the global layer list in creation (level) order.
fn build_layers(keys: &[u64], values: &[u8], w: usize, levels: u8, s: u8) -> Vec<LayerData> {
    let mask: u64 = (1u64 << s) - 1;

    let root_kind = if levels == 1 { LayerKind::Leaf(Vec::new()) } else { LayerKind::Branch(Vec::new()) };
    let mut layers = vec![LayerData { bitmask: 0, kind: root_kind }];
    let mut last_slice = vec![0u32];
    let mut current_layer = vec![0u32; keys.len()];

    for depth in (0..levels).rev() {
        let shift = depth as u32 * s as u32;
        for i in 0..keys.len() {
            let x = ((keys[i] >> shift) & mask) as u32;
            let layer_idx = current_layer[i] as usize;

            if depth == 0 {
                let layer = &mut layers[layer_idx];
                if let LayerKind::Leaf(vals) = &mut layer.kind {
                    vals.extend_from_slice(&values[i * w..(i + 1) * w]);
                }
                layer.bitmask |= 1u64 << x;
                continue;
            }

            let bit_set = (layers[layer_idx].bitmask >> x) & 1 != 0;
            if bit_set {
                debug_assert_eq!(last_slice[layer_idx], x,
                    "ascending keys must share a slice with the most recently created child");
                let child_idx = match &layers[layer_idx].kind {
                    LayerKind::Branch(children) => *children.last().unwrap(),
                    LayerKind::Leaf(_) => unreachable!("non-leaf depth must hold a branch layer"),
                };
                current_layer[i] = child_idx;
            } else {
                let child_depth = depth - 1;
                let child_kind = if child_depth == 0 { LayerKind::Leaf(Vec::new()) } else { LayerKind::Branch(Vec::new()) };
                let new_idx = layers.len() as u32;
                layers.push(LayerData { bitmask: 0, kind: child_kind });
                last_slice.push(0);
                if let LayerKind::Branch(children) = &mut layers[layer_idx].kind {
                    children.push(new_idx);
                }
                layers[layer_idx].bitmask |= 1u64 << x;
                last_slice[layer_idx] = x;
                current_layer[i] = new_idx;
            }
        }
    }
    layers
}

/// Picks the smallest pointer width in `{1, 2, 3, 4}` bytes for which the whole body (all
/// layers, excluding the 2-byte header) fits in that many bytes of offset space.
fn choose_pointer_bytes(layers: &[LayerData], bitmask_bytes: u8, value_bytes: u8) -> Result<u8, Error> {
    let num_layers = layers.len() as u64;
    let mut pointer_count: u64 = 0;
    let mut value_count: u64 = 0;
    for layer in layers {
        match &layer.kind {
            LayerKind::Branch(children) => pointer_count += children.len() as u64,
            LayerKind::Leaf(values) => value_count += (values.len() / value_bytes as usize) as u64,
        }
    }
    let fixed = num_layers * bitmask_bytes as u64 + value_count * value_bytes as u64;
    for p in 1u8..=4 {
        let total = fixed + pointer_count * p as u64;
        let cap = 1u64 << (8 * p as u32);
        if total <= cap {
            return Ok(p);
        }
    }
    Err(Error::AddressSpaceExceeded)
}

/// Writes the header followed by every layer's bytes, in creation order.
fn emit(layers: &[LayerData], header: Header) -> Vec<u8> {
    let offsets = layer_offsets(layers, header.bitmask_bytes, header.pointer_bytes, header.value_bytes);
    let total_body = offsets.last().copied().unwrap_or(0)
        + layers.last().map_or(0, |l| layer_size(l, header.bitmask_bytes, header.pointer_bytes, header.value_bytes));

    let mut out = Vec::with_capacity(2 + total_body as usize);
    out.extend_from_slice(&header.encode().to_le_bytes());
    for layer in layers {
        out.extend_from_slice(&layer.bitmask.to_le_bytes()[..header.bitmask_bytes as usize]);
        match &layer.kind {
            LayerKind::Branch(children) => {
                for &child in children {
                    encode_le(offsets[child as usize], header.pointer_bytes, &mut out);
                }
            }
            LayerKind::Leaf(values) => out.extend_from_slice(values),
        }
    }
    out
}

fn layer_size(layer: &LayerData, bitmask_bytes: u8, pointer_bytes: u8, value_bytes: u8) -> u64 {
    let unit = match &layer.kind {
        LayerKind::Branch(_) => pointer_bytes as u64,
        LayerKind::Leaf(_) => value_bytes as u64,
    };
    bitmask_bytes as u64 + layer.item_count() as u64 * unit
}

fn layer_offsets(layers: &[LayerData], bitmask_bytes: u8, pointer_bytes: u8, value_bytes: u8) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(layers.len());
    let mut running = 0u64;
    for layer in layers {
        offsets.push(running);
        running += layer_size(layer, bitmask_bytes, pointer_bytes, value_bytes);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reader;

    #[test]
    fn empty_build() {
        let b = Builder::new(1, 1).unwrap();
        let buf = b.dump::<u8>(&[], &[]).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn single_key_exact_bytes() {
        let b = Builder::new(1, 1).unwrap();
        let buf = b.dump(&[0x00u64], &[0x2Au8]).unwrap();
        assert_eq!(buf, vec![0x01, 0x00, 0x01, 0x2A]);
        let r = Reader::new(&buf).unwrap();
        assert_eq!(r.get(0, 0u8), 0x2A);
        assert_eq!(r.get(1, 0u8), 0);
        assert!(!r.exists(1));
    }

    #[test]
    fn two_keys_high_slice() {
        let b = Builder::new(1, 1).unwrap();
        let buf = b.dump(&[0x00u64, 0x08], &[0xAAu8, 0xBB]).unwrap();
        let r = Reader::new(&buf).unwrap();
        assert_eq!(r.levels(), 2);
        assert_eq!(r.pointer_bytes(), 1);
        assert_eq!(r.get(0, 0u8), 0xAA);
        assert_eq!(r.get(8, 0u8), 0xBB);
        assert!(!r.exists(1));
        assert!(!r.exists(9));
    }

    #[test]
    fn four_byte_floats() {
        let b = Builder::new(4, 4).unwrap();
        let buf = b.dump(&[1u64, 32, 33], &[1.0f32, 2.0, 3.0]).unwrap();
        let r = Reader::new(&buf).unwrap();
        assert_eq!(r.levels(), 2);
        assert_eq!(r.get(1, 0.0f32), 1.0);
        assert_eq!(r.get(32, 0.0f32), 2.0);
        assert_eq!(r.get(33, 0.0f32), 3.0);
        assert_eq!(r.get(2, -1.0f32), -1.0);
    }

    #[test]
    fn dense_leaf() {
        let keys: Vec<u64> = (0..8).collect();
        let values: Vec<u8> = (0..8).collect();
        let b = Builder::new(1, 1).unwrap();
        let buf = b.dump(&keys, &values).unwrap();
        let r = Reader::new(&buf).unwrap();
        assert_eq!(r.levels(), 1);
        for i in 0..8u64 {
            assert_eq!(r.get(i, 255u8), i as u8);
        }
        assert_eq!(r.get(8, 255u8), 255);
    }

    #[test]
    fn pointer_width_promotion() {
        // Enough distinct high-order keys to push the body size above 2^8 bytes so P=2 is chosen.
        let keys: Vec<u64> = (0..400u64).map(|i| i * 8).collect();
        let values: Vec<u8> = (0..400u64).map(|i| (i % 251) as u8).collect();
        let b = Builder::new(1, 1).unwrap();
        let buf = b.dump(&keys, &values).unwrap();
        let r = Reader::new(&buf).unwrap();
        assert_eq!(r.pointer_bytes(), 2);
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(r.get(k, 0xFFu8), values[i]);
        }
    }

    #[test]
    fn key_order_violation() {
        let b = Builder::new(1, 1).unwrap();
        assert_eq!(b.dump(&[2u64, 1], &[0u8, 0u8]), Err(Error::KeyOrderViolation));
        assert_eq!(b.dump(&[1u64, 1], &[0u8, 0u8]), Err(Error::KeyOrderViolation));
    }

    #[test]
    fn value_width_mismatch() {
        let b = Builder::new(1, 2).unwrap();
        assert_eq!(b.dump(&[1u64], &[0u8]), Err(Error::ValueWidthMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn invalid_width_rejected() {
        assert_eq!(Builder::new(3, 1), Err(Error::InvalidWidth(3)));
        assert_eq!(Builder::new(1, 5), Err(Error::InvalidWidth(5)));
    }

    #[test]
    fn large_round_trip() {
        let keys: Vec<u64> = (0..5000u64).map(|i| i * 3).collect();
        let values: Vec<u32> = (0..5000u32).collect();
        let b = Builder::new(2, 4).unwrap();
        let buf = b.dump(&keys, &values).unwrap();
        let r = Reader::new(&buf).unwrap();
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(r.get(k, u32::MAX), values[i]);
        }
        assert!(!r.exists(1));
        assert!(!r.exists(keys[keys.len() - 1] + 1));
    }
}
