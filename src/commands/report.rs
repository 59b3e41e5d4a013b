//! Human-readable summary of an executed plan
//!
//! Printed on stderr so that `-r -` can stream flash contents to stdout.

use ecpflasher_core::flash::{EraseStrategy, Operation, Outcome, Plan, Report};
use ecpflasher_core::status::{self, flash::SR1_FIELDS, flash::SR2_FIELDS};

pub fn print(report: &Report, plan: &Plan) {
    let identity = &report.identity;
    eprintln!("{}", identity.device);
    eprintln!("USERCODE: 0x{:08X}", identity.usercode);
    eprintln!("{}", identity.status);
    for field in identity.status.fields() {
        log::debug!("  {}", field);
    }

    match &report.outcome {
        Outcome::Probed(probe) => {
            eprintln!("flash ID: {}", probe.jedec);
            eprintln!(
                "SR1: 0x{:02X}  SR2: 0x{:02X}  SR3: 0x{:02X}",
                probe.sr1.bits(),
                probe.sr2,
                probe.sr3
            );
            for field in status::decode(probe.sr1.bits() as u64, SR1_FIELDS) {
                eprintln!("  {}", field);
            }
            for field in status::decode(probe.sr2 as u64, SR2_FIELDS) {
                eprintln!("  {}", field);
            }
        }
        Outcome::SramLoaded(status) => {
            eprintln!("{}", status);
            if status.done() {
                eprintln!("SRAM configured, DONE is set");
            } else {
                eprintln!("SRAM loaded but DONE is not set");
            }
        }
        Outcome::Programmed(len) => {
            eprintln!("wrote {} bytes at 0x{:06X}", len, plan.offset);
            if let Operation::Program(options) = plan.operation {
                if options.verify {
                    eprintln!("VERIFY OK");
                }
            }
        }
        Outcome::Erased(Some(region)) => {
            eprintln!(
                "erased 0x{:06X}..0x{:06X} ({} x {})",
                region.begin(),
                region.end(),
                region.block_count(),
                region.block().name()
            );
        }
        Outcome::Erased(None) => {
            if let Operation::Erase {
                erase: EraseStrategy::Bulk,
                ..
            } = plan.operation
            {
                eprintln!("bulk erase done");
            }
        }
        Outcome::Verified(len) => eprintln!("VERIFY OK ({} bytes)", len),
        Outcome::Read(data) => eprintln!("read {} bytes at 0x{:06X}", data.len(), plan.offset),
    }

    if plan.refresh {
        eprintln!("rebooting FPGA");
    }
}
