//! Memory type selection

use ash::vk;

/// First memory type allowed by `type_bits` whose flags contain `required`
///
/// Scans in table order, so the same table always yields the same index.
pub fn select_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = memory_properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count).find(|&i| {
        (type_bits & (1 << i)) != 0
            && memory_properties.memory_types[i as usize].property_flags.contains(required)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_LOCAL: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
    const HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
        vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
    );

    fn table(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (slot, &property_flags) in properties.memory_types.iter_mut().zip(flags) {
            *slot = vk::MemoryType { property_flags, heap_index: 0 };
        }
        properties
    }

    #[test]
    fn test_first_matching_index_wins() {
        let properties = table(&[DEVICE_LOCAL, HOST, HOST | DEVICE_LOCAL, HOST]);

        assert_eq!(select_memory_type(&properties, 0b1111, HOST), Some(1));
        assert_eq!(select_memory_type(&properties, 0b1111, DEVICE_LOCAL), Some(0));
        assert_eq!(select_memory_type(&properties, 0b1111, HOST | DEVICE_LOCAL), Some(2));
    }

    #[test]
    fn test_respects_type_bits() {
        let properties = table(&[HOST, DEVICE_LOCAL, HOST]);

        assert_eq!(select_memory_type(&properties, 0b100, HOST), Some(2));
        assert_eq!(select_memory_type(&properties, 0b010, HOST), None);
    }

    #[test]
    fn test_is_deterministic() {
        let properties = table(&[DEVICE_LOCAL, HOST, HOST]);
        let first = select_memory_type(&properties, u32::MAX, HOST);

        for _ in 0..8 {
            assert_eq!(select_memory_type(&properties, u32::MAX, HOST), first);
        }
    }

    #[test]
    fn test_ignores_entries_past_count() {
        let mut properties = table(&[DEVICE_LOCAL]);
        properties.memory_types[1].property_flags = HOST;

        assert_eq!(select_memory_type(&properties, u32::MAX, HOST), None);
    }
}
