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

use sil::ast::tree::VariableType;

pub const NUM_REGISTER_TYPES: usize = 4;

/// D3D12 register classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterType
{
    ConstantBuffer,
    ShaderResource,
    UnorderedAccess,
    Sampler
}

pub const REGISTER_TYPES: [RegisterType; NUM_REGISTER_TYPES] = [
    RegisterType::ConstantBuffer,
    RegisterType::ShaderResource,
    RegisterType::UnorderedAccess,
    RegisterType::Sampler
];

impl RegisterType
{
    pub fn index(self) -> usize
    {
        match self {
            RegisterType::ConstantBuffer => 0,
            RegisterType::ShaderResource => 1,
            RegisterType::UnorderedAccess => 2,
            RegisterType::Sampler => 3
        }
    }

    /// HLSL register letter (`b0`, `t0`, `u0`, `s0`).
    pub fn register_char(self) -> char
    {
        match self {
            RegisterType::ConstantBuffer => 'b',
            RegisterType::ShaderResource => 't',
            RegisterType::UnorderedAccess => 'u',
            RegisterType::Sampler => 's'
        }
    }

    pub fn range_type_name(self) -> &'static str
    {
        match self {
            RegisterType::ConstantBuffer => "D3D12_DESCRIPTOR_RANGE_TYPE_CBV",
            RegisterType::ShaderResource => "D3D12_DESCRIPTOR_RANGE_TYPE_SRV",
            RegisterType::UnorderedAccess => "D3D12_DESCRIPTOR_RANGE_TYPE_UAV",
            RegisterType::Sampler => "D3D12_DESCRIPTOR_RANGE_TYPE_SAMPLER"
        }
    }
}

/// Register class a variable's descriptor lives in. Basic/struct constants
/// and group instances do not consume descriptors themselves (the injected
/// ConstantBuffer marker and the flattened copies do), so they map to None.
pub fn register_type(vtype: &VariableType) -> Option<RegisterType>
{
    match vtype {
        VariableType::ConstantBuffer => Some(RegisterType::ConstantBuffer),
        VariableType::Texture2D(_) => Some(RegisterType::ShaderResource),
        VariableType::RwTexture2D(_) => Some(RegisterType::UnorderedAccess),
        VariableType::ByteAddressBuffer => Some(RegisterType::ShaderResource),
        VariableType::RwByteAddressBuffer => Some(RegisterType::UnorderedAccess),
        VariableType::StructuredBuffer(_) => Some(RegisterType::ShaderResource),
        VariableType::RwStructuredBuffer(_) => Some(RegisterType::UnorderedAccess),
        VariableType::RaytracingAccelerationStructure => Some(RegisterType::ShaderResource),
        VariableType::Unresolved(_)
        | VariableType::Basic(_)
        | VariableType::Struct(_)
        | VariableType::Group(_) => None
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn resource_classes()
    {
        assert_eq!(
            register_type(&VariableType::Texture2D("float4".into())),
            Some(RegisterType::ShaderResource)
        );
        assert_eq!(
            register_type(&VariableType::RwByteAddressBuffer),
            Some(RegisterType::UnorderedAccess)
        );
        assert_eq!(
            register_type(&VariableType::ConstantBuffer),
            Some(RegisterType::ConstantBuffer)
        );
        assert_eq!(register_type(&VariableType::Unresolved("x".into())), None);
    }

    #[test]
    fn indices_roundtrip()
    {
        for (i, register_type) in REGISTER_TYPES.iter().enumerate() {
            assert_eq!(register_type.index(), i);
        }
    }
}
