//! Group accessor laws.

use quickcheck_macros::quickcheck;

use fuzzbv::ast::width_mask;
use fuzzbv::group::IndexGroup;

fn group_of(n: usize) -> IndexGroup {
    // Spread over non-adjacent indices so layout bugs cannot hide.
    let indices: Vec<usize> = (0..n).map(|i| i * 2).collect();
    IndexGroup::from_indices(&indices).unwrap()
}

#[quickcheck]
fn little_endian_round_trip(value: u64, size: u8) -> bool {
    let n = 1 + (size as usize % 8);
    let g = group_of(n);
    let value = value & width_mask(g.bits());

    let mut buf = vec![0u64; 16];
    g.set_le(&mut buf, value);
    g.value_le(&buf) == value
}

#[quickcheck]
fn big_endian_round_trip(value: u64, size: u8) -> bool {
    let n = 1 + (size as usize % 8);
    let g = group_of(n);
    let value = value & width_mask(g.bits());

    let mut buf = vec![0u64; 16];
    g.set_be(&mut buf, value);
    g.value_be(&buf) == value
}

#[quickcheck]
fn endianness_mirrors_byte_order(value: u64) -> bool {
    let g = group_of(4);
    let value = value & width_mask(32);

    let mut le = vec![0u64; 16];
    let mut be = vec![0u64; 16];
    g.set_le(&mut le, value);
    g.set_be(&mut be, value);

    g.as_slice()
        .iter()
        .zip(g.as_slice().iter().rev())
        .all(|(&a, &b)| le[a as usize] == be[b as usize])
}

#[quickcheck]
fn set_only_touches_group_bytes(value: u64) -> bool {
    let g = group_of(3);
    let mut buf = vec![0xaa_u64; 16];
    g.set_le(&mut buf, value & width_mask(g.bits()));
    buf.iter()
        .enumerate()
        .all(|(i, &v)| g.contains(i) || v == 0xaa)
}
