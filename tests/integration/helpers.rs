//! Fake hosts for driving full monitoring passes

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use health_monitor::{
    collectors::CollectorContext,
    command::CannedRunner,
    config::{MonitorConfig, ThresholdConfig},
    procfs::MockFs,
};

/// Values a fake host reports. `None` means the tool is missing.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    pub cpu: Option<f64>,
    pub memory: Option<u64>,
    pub disks: Option<Vec<(&'static str, u32)>>,
    pub load: Option<f64>,
    pub cores: usize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            cores: 4,
            ..Self::default()
        }
    }

    pub fn cpu(mut self, busy: f64) -> Self {
        self.cpu = Some(busy);
        self
    }

    pub fn memory(mut self, percent: u64) -> Self {
        self.memory = Some(percent);
        self
    }

    pub fn disks(mut self, disks: &[(&'static str, u32)]) -> Self {
        self.disks = Some(disks.to_vec());
        self
    }

    pub fn load(mut self, load: f64, cores: usize) -> Self {
        self.load = Some(load);
        self.cores = cores;
        self
    }

    pub fn runner(&self) -> CannedRunner {
        let mut runner = CannedRunner::new().with_output("nproc", &format!("{}\n", self.cores));

        if let Some(busy) = self.cpu {
            runner = runner.with_output("top -bn1", &top_output(busy));
        }
        if let Some(percent) = self.memory {
            runner = runner.with_output("free", &free_output(percent));
        }
        if let Some(disks) = &self.disks {
            runner = runner.with_output("df -PT", &df_output(disks));
        }

        runner
    }

    pub fn fs(&self) -> MockFs {
        let fs = MockFs::new();
        match self.load {
            Some(load) => fs.with_file("/proc/loadavg", &format!("{load:.2} 0.50 0.40 1/200 4242\n")),
            None => fs,
        }
    }

    /// Runner and filesystem of this host, without native fallbacks.
    pub fn context(&self) -> (Arc<CannedRunner>, CollectorContext) {
        let runner = Arc::new(self.runner());
        let ctx = CollectorContext::new(runner.clone(), Arc::new(self.fs()), Duration::from_secs(2));
        (runner, ctx)
    }
}

pub fn top_output(busy: f64) -> String {
    format!(
        "top - 12:00:00 up 1 day,  1 user,  load average: 0.10, 0.10, 0.10
Tasks: 100 total,   1 running,  99 sleeping,   0 stopped,   0 zombie
%Cpu(s): {busy:.1} us,  0.0 sy,  0.0 ni, {:.1} id,  0.0 wa,  0.0 hi,  0.0 si,  0.0 st
",
        100.0 - busy
    )
}

pub fn free_output(percent: u64) -> String {
    let total = 1_000_000u64;
    let used = total * percent / 100;
    format!(
        "               total        used        free      shared  buff/cache   available
Mem:        {total}     {used}     {}           0           0     {}
Swap:              0           0           0
",
        total - used,
        total - used
    )
}

pub fn df_output(disks: &[(&str, u32)]) -> String {
    let mut output = String::from(
        "Filesystem     Type     1024-blocks      Used Available Capacity Mounted on\n\
         tmpfs          tmpfs        1600000      2000   1598000       1% /run\n",
    );
    for (index, (mount, percent)) in disks.iter().enumerate() {
        let used = 1000 * *percent as u64;
        output.push_str(&format!(
            "/dev/sda{index}      ext4          100000    {used}     {}      {percent}% {mount}\n",
            100_000 - used
        ));
    }
    output
}

pub fn default_config() -> MonitorConfig {
    MonitorConfig::new(ThresholdConfig::default(), Duration::from_secs(2), true).unwrap()
}

/// Console writer that can be inspected after the sink took ownership.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
