//! Info-log printing for shader and program objects.

use std::io::{self, Write};

use crate::core::{DeviceError, DeviceResult, GraphicsDevice, ProgramId, ShaderId};

/// Prints the shader's info log under a `Shader Info Log:` header.
///
/// Nothing is written when the log is empty.
pub fn print_compile_log<D>(device: &D, shader: ShaderId, out: &mut dyn Write) -> io::Result<()>
where
    D: GraphicsDevice + ?Sized,
{
    let len = device.shader_info_log_len(shader).map_err(to_io)?;
    print_log(out, "Shader Info Log:", len, |buf| {
        device.shader_info_log(shader, buf)
    })
}

/// Prints the program's info log under a `Program Info Log:` header.
///
/// Nothing is written when the log is empty.
pub fn print_link_log<D>(device: &D, program: ProgramId, out: &mut dyn Write) -> io::Result<()>
where
    D: GraphicsDevice + ?Sized,
{
    let len = device.program_info_log_len(program).map_err(to_io)?;
    print_log(out, "Program Info Log:", len, |buf| {
        device.program_info_log(program, buf)
    })
}

fn print_log(
    out: &mut dyn Write,
    header: &str,
    len: usize,
    fetch: impl FnOnce(&mut [u8]) -> DeviceResult<usize>,
) -> io::Result<()> {
    if len == 0 {
        return Ok(());
    }

    let mut scratch = vec![0u8; len];
    let written = fetch(&mut scratch).map_err(to_io)?;
    scratch.truncate(written);

    writeln!(out, "{header}")?;
    out.write_all(&scratch)?;
    writeln!(out)?;
    out.flush()
}

fn to_io(err: DeviceError) -> io::Error {
    io::Error::other(err)
}
