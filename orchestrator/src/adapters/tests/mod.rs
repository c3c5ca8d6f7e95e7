//! Adapter tests against an in-memory register bank

#[cfg(test)]
mod drying;

#[cfg(test)]
pub mod common {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{OrchestratorError, OrchestratorResult};
    use crate::traits::RegisterClient;

    /// One recorded write
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Write {
        Registers(u16, Vec<u16>),
        Coil(u16, bool),
    }

    /// Register bank standing in for a controller
    #[derive(Default)]
    pub struct FakeRegisterBank {
        registers: Mutex<HashMap<u16, u16>>,
        coils: Mutex<HashMap<u16, bool>>,
        failing: Mutex<HashSet<u16>>,
        writes: Mutex<Vec<Write>>,
        reads: Mutex<Vec<(u16, u16)>>,
    }

    impl FakeRegisterBank {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_word(&self, address: u16, value: u16) -> &Self {
            self.registers.lock().unwrap().insert(address, value);
            self
        }

        pub fn set_words(&self, address: u16, values: &[u16]) -> &Self {
            let mut registers = self.registers.lock().unwrap();
            for (offset, value) in values.iter().enumerate() {
                registers.insert(address + offset as u16, *value);
            }
            self
        }

        pub fn set_coil(&self, address: u16, value: bool) -> &Self {
            self.coils.lock().unwrap().insert(address, value);
            self
        }

        /// Make any read touching `address` fail
        pub fn fail_at(&self, address: u16) -> &Self {
            self.failing.lock().unwrap().insert(address);
            self
        }

        pub fn word(&self, address: u16) -> u16 {
            self.registers.lock().unwrap().get(&address).copied().unwrap_or(0)
        }

        pub fn writes(&self) -> Vec<Write> {
            self.writes.lock().unwrap().clone()
        }

        pub fn reads(&self) -> Vec<(u16, u16)> {
            self.reads.lock().unwrap().clone()
        }

        fn check(&self, address: u16, count: u16) -> OrchestratorResult<()> {
            let failing = self.failing.lock().unwrap();
            if (address..address + count).any(|a| failing.contains(&a)) {
                return Err(OrchestratorError::protocol(address, "illegal data address"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RegisterClient for FakeRegisterBank {
        async fn connect(&self) -> OrchestratorResult<()> {
            Ok(())
        }

        async fn disconnect(&self) -> OrchestratorResult<()> {
            Ok(())
        }

        async fn read_registers(&self, address: u16, count: u16) -> OrchestratorResult<Vec<u16>> {
            self.check(address, count)?;
            self.reads.lock().unwrap().push((address, count));
            let registers = self.registers.lock().unwrap();
            Ok((address..address + count)
                .map(|a| registers.get(&a).copied().unwrap_or(0))
                .collect())
        }

        async fn read_coils(&self, address: u16, count: u16) -> OrchestratorResult<Vec<bool>> {
            self.check(address, count)?;
            let coils = self.coils.lock().unwrap();
            Ok((address..address + count)
                .map(|a| coils.get(&a).copied().unwrap_or(false))
                .collect())
        }

        async fn write_registers(&self, address: u16, words: &[u16]) -> OrchestratorResult<()> {
            self.set_words(address, words);
            self.writes.lock().unwrap().push(Write::Registers(address, words.to_vec()));
            Ok(())
        }

        async fn write_register(&self, address: u16, word: u16) -> OrchestratorResult<()> {
            self.write_registers(address, &[word]).await
        }

        async fn write_coil(&self, address: u16, value: bool) -> OrchestratorResult<()> {
            self.set_coil(address, value);
            self.writes.lock().unwrap().push(Write::Coil(address, value));
            Ok(())
        }
    }

    /// Put `text` into the bank the way the controller stores it
    pub fn text_words(text: &str, words: usize) -> Vec<u16> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(words * 2, 0);
        bytes
            .chunks(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}
