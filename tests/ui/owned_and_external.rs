use fixed_kit::{Bitset, BitsetExt, Error, word_count};

const BIT_COUNT: usize = 36;
type Flags = Bitset<u16, BIT_COUNT, { word_count::<u16>(BIT_COUNT) }>;

const EMPTY: Flags = Flags::const_empty();

fn main() {
    let mut owned = EMPTY;
    owned.set(0);
    owned.set(35);
    assert_eq!(owned.count(), 2);

    let mut buffer = [0u16; 3];
    let mut external = BitsetExt::<u16, BIT_COUNT>::from_bitset(&owned, &mut buffer).unwrap();
    external.flip_all();
    external ^= &owned;
    assert!(external.all());
    assert_eq!(external.value::<u32>(), Err(Error::BitsetTypeTooSmall));
    assert_eq!(external.to_u64(), Ok(0xF_FFFF_FFFF));
}
