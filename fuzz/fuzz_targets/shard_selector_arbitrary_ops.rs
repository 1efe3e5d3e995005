#![no_main]

use libfuzzer_sys::fuzz_target;
use mirrorkit::ds::ShardSelector;
use mirrorkit::model::Id;

// Fuzz guild-to-shard selection
//
// Every guild id maps to exactly one shard in range, and the mapping ignores
// the low 22 bits of the snowflake.
fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }

    let shards = u32::from(data[0]);
    let selector = ShardSelector::new(shards);
    assert_eq!(selector.shard_count(), shards.max(1));

    for chunk in data[1..].chunks_exact(8) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        let guild = Id::new(u64::from_le_bytes(raw));

        let shard = selector.shard_for(guild);
        assert!(shard < selector.shard_count());
        assert_eq!(shard, selector.shard_for(guild));

        let owners = (0..selector.shard_count())
            .filter(|&index| selector.owns(index, guild))
            .count();
        assert_eq!(owners, 1);

        let same_tick = Id::new(guild.get() ^ 0x3F_FFFF);
        assert_eq!(selector.shard_for(same_tick), shard);
    }
});
