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

mod backends;
mod error;
mod strings;
mod write;

use std::path::Path;

use clap::{App, Arg};
use log::{debug, error, info, LevelFilter};
use simple_logger::SimpleLogger;

use crate::backends::dx12::{
    allocation::allocate_registers,
    device::generate_device_code,
    host::generate_host_code
};
use crate::error::Error;

fn compile(input_file: &Path) -> Result<(), Error>
{
    let mut ctx = sil::parser::Context::new();
    let parse_tree = sil::parser::parse_file(input_file, &mut ctx)?;
    if parse_tree.output.cpp_folder.as_os_str().is_empty() && parse_tree.output.shader_folder.as_os_str().is_empty() {
        return Err(Error::MissingOutput(input_file.into()));
    }
    let mut tree = sil::ast::build_ast(parse_tree)?;
    let bindings = allocate_registers(&mut tree)?;
    generate_device_code(&tree, &bindings)?;
    generate_host_code(&tree, &bindings)?;
    Ok(())
}

fn main()
{
    //Log everything
    SimpleLogger::new().init().unwrap();
    let matches = App::new("sic")
        .author("BlockProject 3D")
        .about("BlockProject 3D SDK - Shader Input Compiler (converts *.si files into *.h and *.hlsl files)")
        .version("1.0.0")
        .args([
            Arg::new("verbose").short('v').long("verbose").multiple_occurrences(true)
                .help("Enable verbose output"),
            Arg::new("file").required(true).help("Path of the root *.si input file")
        ])
        .get_matches();
    let verbosity = matches.occurrences_of("verbose");
    match verbosity {
        0 => log::set_max_level(LevelFilter::Error),
        1 => log::set_max_level(LevelFilter::Warn),
        2 => log::set_max_level(LevelFilter::Info),
        3 => log::set_max_level(LevelFilter::Debug),
        _ => log::set_max_level(LevelFilter::Trace),
    };
    info!("Initializing BlockProject 3D Shader Input Compiler...");
    let input_file = Path::new(matches.value_of_os("file").unwrap());
    debug!("Input file: {}", input_file.display());
    if let Err(e) = compile(input_file) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::SystemTime;

    use super::*;

    const ROOT_FILE: &str = "\
#output \"generated/cpp\" \"generated/shaders\"
#include \"common.si\"
#constant MAX_LIGHTS 4

BindPoint Frame {};
ShaderInputGroup Lighting<BindTo=Frame>
{
    Texture2D<float4> shadowMap;
    StructuredBuffer<PointLight> lights[MAX_LIGHTS];
    float3 sunDirection;
};
ShaderInputLayout Forward
{
    RootConstant drawId { .shaderStages = [vertex], .num32BitValues = 1 };
    frame Frame { .shaderStages = [pixel] };
};
";

    const COMMON_FILE: &str = "\
#output \"common/cpp\" \"common/shaders\"
struct PointLight
{
    float3 position;
    float intensity;
};
";

    fn setup(name: &str) -> PathBuf
    {
        let dir = std::env::temp_dir().join("sic-main-tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("inputs.si"), ROOT_FILE).unwrap();
        std::fs::write(dir.join("common.si"), COMMON_FILE).unwrap();
        dir
    }

    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, SystemTime>
    {
        let mut out = BTreeMap::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            for entry in std::fs::read_dir(&current).unwrap() {
                let entry = entry.unwrap();
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    out.insert(path, entry.metadata().unwrap().modified().unwrap());
                }
            }
        }
        out
    }

    #[test]
    fn end_to_end_compile_is_idempotent()
    {
        let dir = setup("idempotent");
        compile(&dir.join("inputs.si")).unwrap();

        let generated = dir.join("generated");
        assert!(generated.join("shaders/inputgroups/Forward/Lighting.hlsl").exists());
        assert!(generated.join("shaders/inputlayouts/Forward.hlsl").exists());
        assert!(generated.join("shaders/constants.hlsl").exists());
        assert!(generated.join("cpp/inputgroups/Lighting.h").exists());
        assert!(generated.join("cpp/bindpoints/Frame.h").exists());
        assert!(generated.join("cpp/inputlayouts/Forward.h").exists());
        // Items of the included file are not exported.
        assert!(!dir.join("common").exists());

        let before = snapshot(&generated);
        assert!(!before.is_empty());
        // Make sure a rewrite would be visible in the mtimes.
        std::thread::sleep(std::time::Duration::from_millis(1100));
        compile(&dir.join("inputs.si")).unwrap();
        let after = snapshot(&generated);
        assert_eq!(before, after);
    }

    #[test]
    fn changed_input_rewrites_output()
    {
        let dir = setup("rewrite");
        let input = dir.join("inputs.si");
        compile(&input).unwrap();
        let layout = dir.join("generated/shaders/inputgroups/Forward/Lighting.hlsl");
        let before = std::fs::read_to_string(&layout).unwrap();

        let changed = ROOT_FILE.replace("Texture2D<float4> shadowMap;", "Texture2D<float4> shadowMap;\n    ByteAddressBuffer extra;");
        std::fs::write(&input, changed).unwrap();
        compile(&input).unwrap();
        let after = std::fs::read_to_string(&layout).unwrap();
        assert_ne!(before, after);
        assert!(after.contains("ByteAddressBuffer _extra"));
    }

    #[test]
    fn missing_output_is_fatal()
    {
        let dir = std::env::temp_dir().join("sic-main-tests").join("no-output");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("inputs.si"), "BindPoint Frame {};\n").unwrap();
        let err = compile(&dir.join("inputs.si")).unwrap_err();
        assert!(matches!(err, Error::MissingOutput(_)));
    }
}
