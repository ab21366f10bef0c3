//! Lists serial ports and probes each for the alarm device, so the
//! right `port` value can be copied into config.json.

use colored::*;
use eyesentry::alarm::Command;
use eyesentry::config::LinkConfig;
use eyesentry::link::{ActuatorLink, SerialTransport, Transport};

fn probe(port_name: &str) -> Result<Option<String>, String> {
    let mut config = LinkConfig::default();
    config.port = port_name.to_string();
    // Short timeouts: we only want to know if something answers
    config.send_timeout_ms = 500;
    config.settle_delay_ms = 2000;

    let mut transport = SerialTransport::open(&config).map_err(|e| e.to_string())?;
    transport
        .send_line(Command::Status.token())
        .map_err(|e| e.to_string())?;
    transport.recv_line().map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("{}", "Scanning serial ports...".bold());

    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("{}", "No serial ports detected.".yellow());
        println!("Check that the device is plugged in and its USB driver is installed.");
        println!("Linux: ls -la /dev/ttyUSB* /dev/ttyACM*");
        return Ok(());
    }

    println!("Found {} port(s):\n", ports.len());

    for info in &ports {
        println!("  {}", info.port_name.bold());
        match probe(&info.port_name) {
            Ok(Some(reply)) => {
                println!("    {} reply: {}", "responds".green(), reply)
            }
            Ok(None) => println!("    {} opened, but no reply to STATUS", "silent".yellow()),
            Err(e) => println!("    {} {}", "unreachable".red(), e),
        }
    }

    println!("\nSet the responding port in config.json under \"link\".\"port\".");

    // Optional full self-test of a chosen port
    if let Some(chosen) = std::env::args().nth(1) {
        println!("\nRunning self-test on {}...", chosen);
        let mut config = LinkConfig::default();
        config.port = chosen;
        config.send_timeout_ms = 3000;

        let mut link: ActuatorLink<SerialTransport> = ActuatorLink::new(config);
        link.connect()?;
        match link.send(Command::SelfTest) {
            Ok(ack) => println!(
                "{} {}",
                "Self-test sent.".green(),
                ack.response.unwrap_or_else(|| "(no reply)".to_string())
            ),
            Err(e) => println!("{} {}", "Self-test failed:".red(), e),
        }
        link.close();
    }

    Ok(())
}
