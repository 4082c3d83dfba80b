use payg_core::time_to_string;

use super::CmdResult;

pub fn run(seconds: u64) -> CmdResult {
    println!("{}", time_to_string(seconds));
    Ok(())
}
