use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use naga::back::spv;
use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;

const SHADERS: [(&str, ShaderStage); 2] = [
    ("csg.vert", ShaderStage::Vertex),
    ("csg.frag", ShaderStage::Fragment),
];

fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR is not set")?);
    let src_dir = manifest_dir.join("shaders");
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").context("OUT_DIR is not set")?);

    for (name, stage) in SHADERS {
        let src = src_dir.join(name);
        println!("cargo::rerun-if-changed={}", src.display());

        let words = compile(&src, stage)?;
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();

        let dst = out_dir.join(format!("{name}.spv"));
        std::fs::write(&dst, bytes).with_context(|| format!("failed to write {}", dst.display()))?;
    }

    Ok(())
}

fn compile(path: &Path, stage: ShaderStage) -> Result<Vec<u32>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let module = glsl::Frontend::default()
        .parse(&glsl::Options::from(stage), &source)
        .map_err(|err| anyhow!("{}: {err:?}", path.display()))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| anyhow!("{} failed validation: {err:?}", path.display()))?;

    // The GLSL is written for Vulkan clip space already.
    let mut options = spv::Options::default();
    options.flags.remove(spv::WriterFlags::ADJUST_COORDINATE_SPACE);

    spv::write_vec(&module, &info, &options, None)
        .map_err(|err| anyhow!("{}: SPIR-V generation failed: {err:?}", path.display()))
}
