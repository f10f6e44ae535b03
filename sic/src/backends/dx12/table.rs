// Copyright (c) 2021, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use sil::ast::tree::Variable;

use crate::backends::dx12::register::{RegisterType, NUM_REGISTER_TYPES, REGISTER_TYPES};

/// One descriptor (or contiguous run of descriptors) bound by a variable of
/// a shader input group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBinding
{
    pub variable_idx: u32,
    pub descriptor_offset: u32,
    pub num_descriptors: u32
}

/// Per-input-group content of one descriptor-table root parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable
{
    pub descriptors: Vec<DescriptorBinding>,
    /// Number of descriptors EXCLUDING unbounded descriptor ranges.
    pub num_known_descriptors: u32,
    pub unbounded_variable_idx: Option<u32>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRange
{
    pub base_descriptor_offset: u32,
    pub num_descriptors: u32,
    pub register_type: RegisterType
}

/// Group-independent shape of a descriptor-table root parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTableLayout
{
    pub ranges: Vec<DescriptorRange>
}

struct RangeAllocator
{
    // Persistent between input groups binding to the same bind point.
    register_type: RegisterType,
    max_size: u32,
    base_descriptor_offset: u32,

    // Cleared every time begin_input_group() is called.
    current_offset: u32,
    current_bindings: Vec<DescriptorBinding>
}

/// Builds one descriptor table for a bind point: ranges are fixed up front
/// from per-class descriptor counts, then each input group fills them
/// independently.
pub struct DescriptorTableAllocator
{
    ranges: Vec<RangeAllocator>
}

impl DescriptorTableAllocator
{
    pub fn new(descriptors_per_register_type: &[u32; NUM_REGISTER_TYPES]) -> DescriptorTableAllocator
    {
        let mut ranges: Vec<RangeAllocator> = REGISTER_TYPES
            .iter()
            .zip(descriptors_per_register_type)
            .filter(|(_, &num_descriptors)| num_descriptors > 0)
            .map(|(&register_type, &num_descriptors)| RangeAllocator {
                register_type,
                max_size: num_descriptors,
                base_descriptor_offset: 0,
                current_offset: 0,
                current_bindings: Vec::new()
            })
            .collect();

        // Sort ranges by size so that an unbounded descriptor range always
        // comes last.
        ranges.sort_by_key(|range| range.max_size);
        debug_assert!(ranges.len() < 2 || ranges[ranges.len() - 2].max_size != Variable::UNBOUNDED);

        let mut descriptor_offset = 0u32;
        for range in &mut ranges {
            range.base_descriptor_offset = descriptor_offset;
            descriptor_offset = descriptor_offset.saturating_add(range.max_size);
        }
        DescriptorTableAllocator { ranges }
    }

    pub fn begin_input_group(&mut self)
    {
        for range in &mut self.ranges {
            range.current_offset = 0;
            range.current_bindings.clear();
        }
    }

    /// First-fit placement into the range of the matching register class.
    /// An unbounded variable consumes the remainder of its range.
    pub fn try_allocate(&mut self, register_type: RegisterType, array_count: u32, variable_idx: u32) -> bool
    {
        for range in &mut self.ranges {
            if range.register_type != register_type {
                continue;
            }
            let descriptor_count = if array_count == 0 { 1 } else { array_count };
            if descriptor_count != Variable::UNBOUNDED {
                let space_left = range.max_size - range.current_offset;
                if space_left < descriptor_count {
                    return false;
                }
            } else if range.current_offset == Variable::UNBOUNDED {
                return false;
            }

            range.current_bindings.push(DescriptorBinding {
                variable_idx,
                descriptor_offset: range.base_descriptor_offset + range.current_offset,
                num_descriptors: descriptor_count
            });
            if descriptor_count == Variable::UNBOUNDED {
                range.current_offset = Variable::UNBOUNDED;
            } else {
                range.current_offset += descriptor_count;
            }
            return true;
        }
        false
    }

    /// Current input group's table content, or None when the group bound
    /// nothing here.
    pub fn table(&self) -> Option<DescriptorTable>
    {
        let mut num_known_descriptors = 0;
        let mut unbounded_variable_idx = None;
        let mut descriptors = Vec::new();
        for range in &self.ranges {
            for binding in &range.current_bindings {
                if binding.num_descriptors == Variable::UNBOUNDED {
                    num_known_descriptors = num_known_descriptors.max(binding.descriptor_offset);
                    debug_assert!(unbounded_variable_idx.is_none());
                    unbounded_variable_idx = Some(binding.variable_idx);
                } else {
                    num_known_descriptors =
                        num_known_descriptors.max(binding.descriptor_offset + binding.num_descriptors);
                }
            }
            descriptors.extend(range.current_bindings.iter().cloned());
        }

        if descriptors.is_empty() {
            return None;
        }
        Some(DescriptorTable {
            descriptors,
            num_known_descriptors,
            unbounded_variable_idx
        })
    }

    pub fn layout(&self) -> DescriptorTableLayout
    {
        DescriptorTableLayout {
            ranges: self
                .ranges
                .iter()
                .map(|range| DescriptorRange {
                    base_descriptor_offset: range.base_descriptor_offset,
                    num_descriptors: range.max_size,
                    register_type: range.register_type
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn counts(cbv: u32, srv: u32, uav: u32, sampler: u32) -> [u32; NUM_REGISTER_TYPES]
    {
        [cbv, srv, uav, sampler]
    }

    #[test]
    fn ranges_sorted_by_size_with_offsets()
    {
        let allocator = DescriptorTableAllocator::new(&counts(1, 4, 2, 0));
        let layout = allocator.layout();
        assert_eq!(layout.ranges.len(), 3);
        assert_eq!(layout.ranges[0].register_type, RegisterType::ConstantBuffer);
        assert_eq!(layout.ranges[0].base_descriptor_offset, 0);
        assert_eq!(layout.ranges[1].register_type, RegisterType::UnorderedAccess);
        assert_eq!(layout.ranges[1].base_descriptor_offset, 1);
        assert_eq!(layout.ranges[2].register_type, RegisterType::ShaderResource);
        assert_eq!(layout.ranges[2].base_descriptor_offset, 3);
    }

    #[test]
    fn unbounded_range_is_last()
    {
        let allocator = DescriptorTableAllocator::new(&counts(2, Variable::UNBOUNDED, 0, 0));
        let layout = allocator.layout();
        assert_eq!(layout.ranges[0].register_type, RegisterType::ConstantBuffer);
        assert_eq!(layout.ranges[1].register_type, RegisterType::ShaderResource);
        assert_eq!(layout.ranges[1].base_descriptor_offset, 2);
        assert_eq!(layout.ranges[1].num_descriptors, Variable::UNBOUNDED);
    }

    #[test]
    fn allocate_and_reset()
    {
        let mut allocator = DescriptorTableAllocator::new(&counts(0, 3, 0, 0));
        assert!(allocator.try_allocate(RegisterType::ShaderResource, 0, 0));
        assert!(allocator.try_allocate(RegisterType::ShaderResource, 2, 1));
        // Range is full now.
        assert!(!allocator.try_allocate(RegisterType::ShaderResource, 0, 2));
        // Wrong class.
        assert!(!allocator.try_allocate(RegisterType::UnorderedAccess, 0, 3));

        let table = allocator.table().unwrap();
        assert_eq!(
            table.descriptors,
            vec![
                DescriptorBinding {
                    variable_idx: 0,
                    descriptor_offset: 0,
                    num_descriptors: 1
                },
                DescriptorBinding {
                    variable_idx: 1,
                    descriptor_offset: 1,
                    num_descriptors: 2
                },
            ]
        );
        assert_eq!(table.num_known_descriptors, 3);
        assert_eq!(table.unbounded_variable_idx, None);

        allocator.begin_input_group();
        assert!(allocator.table().is_none());
        assert!(allocator.try_allocate(RegisterType::ShaderResource, 3, 7));
    }

    #[test]
    fn unbounded_consumes_range_remainder()
    {
        let mut allocator = DescriptorTableAllocator::new(&counts(0, Variable::UNBOUNDED, 0, 0));
        assert!(allocator.try_allocate(RegisterType::ShaderResource, 0, 0));
        assert!(allocator.try_allocate(RegisterType::ShaderResource, Variable::UNBOUNDED, 1));
        // The unbounded binding used up the rest of the range.
        assert!(!allocator.try_allocate(RegisterType::ShaderResource, 0, 2));

        let table = allocator.table().unwrap();
        assert_eq!(table.num_known_descriptors, 1);
        assert_eq!(table.unbounded_variable_idx, Some(1));
        assert_eq!(table.descriptors[1].descriptor_offset, 1);
        assert_eq!(table.descriptors[1].num_descriptors, Variable::UNBOUNDED);
    }
}
