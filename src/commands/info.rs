//! Device information command

use rmiflash_core::session::Session;
use rmiflash_core::transport::RmiTransport;

/// Query the device and print what was found
pub fn run_info<T: RmiTransport + ?Sized>(
    transport: &mut T,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::query(transport)?;

    println!("Functions:");
    println!(
        "  {:<6} {:>3} {:>7} {:>7} {:>7} {:>7} {:>5}",
        "Fn", "Ver", "Query", "Command", "Control", "Data", "IRQs"
    );
    for f in session.directory().iter() {
        println!(
            "  F{:02X}    {:>3}  0x{:04X}  0x{:04X}  0x{:04X}  0x{:04X} {:>5}",
            f.number,
            f.version,
            f.query_base,
            f.command_base,
            f.control_base,
            f.data_base,
            f.interrupt_source_count
        );
    }

    let id = session.bootloader_id();
    println!();
    println!("Bootloader ID: {:02X} {:02X}", id[0], id[1]);
    println!("Block size:    {} bytes", session.block_size());
    println!("F34 status:    0x{:04X}", session.f34_status_addr());
    match session.bootloader() {
        Ok(bl) => println!("Bootloader:    {}", bl),
        Err(e) => println!("Bootloader:    {}", e),
    }

    Ok(())
}
