use crate::error::SettingsError;
use crate::gpu::Extent;

/// Desktop rectangle of an output, in virtual-screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn extent(&self) -> Extent {
        Extent::new(
            (self.right - self.left).max(0) as u32,
            (self.bottom - self.top).max(0) as u32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub index: usize,
    pub device_name: String,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Position in the DXGI enumeration the snapshot was taken from.
    pub index: usize,
    pub name: String,
    pub luid: i64,
    pub dedicated_video_memory: u64,
    pub outputs: Vec<OutputInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub adapter: usize,
    pub output: usize,
}

/// Adapters and their outputs as seen when the settings dialog opened.
/// Indices into it are resolved to driver objects only at session start.
#[derive(Debug, Clone, Default)]
pub struct AdapterSnapshot {
    adapters: Vec<AdapterInfo>,
}

impl AdapterSnapshot {
    pub fn new(adapters: Vec<AdapterInfo>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[AdapterInfo] {
        &self.adapters
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn outputs(&self) -> impl Iterator<Item = (OutputRef, &AdapterInfo, &OutputInfo)> + '_ {
        self.adapters.iter().enumerate().flat_map(|(a, adapter)| {
            adapter.outputs.iter().enumerate().map(move |(o, output)| {
                (OutputRef { adapter: a, output: o }, adapter, output)
            })
        })
    }

    pub fn default_output(&self) -> Option<OutputRef> {
        self.outputs().next().map(|(output_ref, _, _)| output_ref)
    }

    pub fn find_adapter_by_luid(&self, luid: i64) -> Option<usize> {
        self.adapters.iter().position(|a| a.luid == luid)
    }

    pub fn find_output_by_name(&self, device_name: &str) -> Option<OutputRef> {
        self.outputs()
            .find(|(_, _, output)| output.device_name == device_name)
            .map(|(output_ref, _, _)| output_ref)
    }

    pub fn select(&self, render_adapter: usize, output: OutputRef) -> Result<AdapterSelection, SettingsError> {
        if self.adapters.is_empty() {
            return Err(SettingsError::NoAdapters);
        }

        let render = self
            .adapters
            .get(render_adapter)
            .ok_or(SettingsError::UnknownAdapter(render_adapter))?;
        let display = self
            .adapters
            .get(output.adapter)
            .ok_or(SettingsError::UnknownAdapter(output.adapter))?;
        let display_output = display
            .outputs
            .get(output.output)
            .ok_or(SettingsError::UnknownOutput { adapter: output.adapter, output: output.output })?;

        Ok(AdapterSelection {
            render: render.clone(),
            display: display.clone(),
            output: display_output.clone(),
        })
    }
}

/// Render adapter plus the adapter and output that drive the display.
/// The output is always taken from `display`, never chosen independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSelection {
    render: AdapterInfo,
    display: AdapterInfo,
    output: OutputInfo,
}

impl AdapterSelection {
    pub fn render(&self) -> &AdapterInfo {
        &self.render
    }

    pub fn display(&self) -> &AdapterInfo {
        &self.display
    }

    pub fn output(&self) -> &OutputInfo {
        &self.output
    }

    pub fn cross_adapter(&self) -> bool {
        self.render.luid != self.display.luid
    }
}

#[cfg(windows)]
pub fn enumerate() -> anyhow::Result<AdapterSnapshot> {
    use anyhow::Context;
    use windows::Win32::Graphics::Dxgi::*;

    let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1() }.context("Failed to create DXGI factory")?;
    let mut adapters = Vec::new();

    for index in 0.. {
        let adapter = match unsafe { factory.EnumAdapters1(index) } {
            Ok(adapter) => adapter,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => return Err(e).context("Failed to enumerate adapters"),
        };

        let desc = unsafe { adapter.GetDesc1() }.context("Failed to query adapter description")?;
        let mut outputs = Vec::new();

        for output_index in 0.. {
            let output = match unsafe { adapter.EnumOutputs(output_index) } {
                Ok(output) => output,
                Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                Err(e) => return Err(e).context("Failed to enumerate outputs"),
            };
            let output_desc = unsafe { output.GetDesc() }.context("Failed to query output description")?;
            let rect = output_desc.DesktopCoordinates;

            outputs.push(OutputInfo {
                index: output_index as usize,
                device_name: wide_to_string(&output_desc.DeviceName),
                bounds: Bounds {
                    left: rect.left,
                    top: rect.top,
                    right: rect.right,
                    bottom: rect.bottom,
                },
            });
        }

        adapters.push(AdapterInfo {
            index: index as usize,
            name: wide_to_string(&desc.Description),
            luid: pack_luid(desc.AdapterLuid.HighPart, desc.AdapterLuid.LowPart),
            dedicated_video_memory: desc.DedicatedVideoMemory as u64,
            outputs,
        });
    }

    Ok(AdapterSnapshot::new(adapters))
}

pub fn pack_luid(high: i32, low: u32) -> i64 {
    ((high as i64) << 32) | low as i64
}

#[cfg(windows)]
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn adapter(index: usize, name: &str, outputs: &[&str]) -> AdapterInfo {
        AdapterInfo {
            index,
            name: name.to_string(),
            luid: 0x1000 + index as i64,
            dedicated_video_memory: 8 << 30,
            outputs: outputs
                .iter()
                .enumerate()
                .map(|(i, n)| OutputInfo {
                    index: i,
                    device_name: n.to_string(),
                    bounds: Bounds { left: 1920 * i as i32, top: 0, right: 1920 * (i as i32 + 1), bottom: 1080 },
                })
                .collect(),
        }
    }

    /// Integrated GPU driving the monitor, discrete GPU without outputs.
    pub(crate) fn hybrid_laptop() -> AdapterSnapshot {
        AdapterSnapshot::new(vec![
            adapter(0, "Integrated Graphics", &["\\\\.\\DISPLAY1"]),
            adapter(1, "Discrete Graphics", &[]),
        ])
    }

    #[test]
    fn distinct_adapters_are_cross_adapter() {
        let snapshot = hybrid_laptop();
        let selection = snapshot.select(1, OutputRef { adapter: 0, output: 0 }).unwrap();
        assert!(selection.cross_adapter());
        assert_eq!(selection.render().name, "Discrete Graphics");
        assert_eq!(selection.display().name, "Integrated Graphics");
        assert_eq!(selection.output().device_name, "\\\\.\\DISPLAY1");
    }

    #[test]
    fn same_adapter_is_not_cross_adapter() {
        let snapshot = AdapterSnapshot::new(vec![adapter(0, "Only GPU", &["\\\\.\\DISPLAY1", "\\\\.\\DISPLAY2"])]);
        for output in 0..2 {
            let selection = snapshot.select(0, OutputRef { adapter: 0, output }).unwrap();
            assert!(!selection.cross_adapter());
        }
    }

    #[test]
    fn selection_rejects_unknown_indices() {
        let snapshot = hybrid_laptop();
        assert_eq!(
            snapshot.select(5, OutputRef { adapter: 0, output: 0 }),
            Err(SettingsError::UnknownAdapter(5))
        );
        assert_eq!(
            snapshot.select(0, OutputRef { adapter: 1, output: 0 }),
            Err(SettingsError::UnknownOutput { adapter: 1, output: 0 })
        );
        assert_eq!(
            AdapterSnapshot::default().select(0, OutputRef { adapter: 0, output: 0 }),
            Err(SettingsError::NoAdapters)
        );
    }

    #[test]
    fn outputs_are_listed_with_their_owning_adapter() {
        let snapshot = AdapterSnapshot::new(vec![
            adapter(0, "A", &["\\\\.\\DISPLAY1"]),
            adapter(1, "B", &["\\\\.\\DISPLAY2", "\\\\.\\DISPLAY3"]),
        ]);
        let listed: Vec<(OutputRef, String)> = snapshot
            .outputs()
            .map(|(r, a, o)| (r, format!("{}:{}", a.name, o.device_name)))
            .collect();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2], (OutputRef { adapter: 1, output: 1 }, "B:\\\\.\\DISPLAY3".to_string()));
        assert_eq!(snapshot.find_output_by_name("\\\\.\\DISPLAY2"), Some(OutputRef { adapter: 1, output: 0 }));
        assert_eq!(snapshot.find_adapter_by_luid(0x1001), Some(1));
        assert_eq!(snapshot.default_output(), Some(OutputRef { adapter: 0, output: 0 }));
    }

    #[test]
    fn bounds_give_output_extent() {
        let bounds = Bounds { left: -1920, top: 0, right: 0, bottom: 1200 };
        assert_eq!(bounds.extent(), Extent::new(1920, 1200));
    }

    #[test]
    fn luid_packing_keeps_both_halves() {
        assert_eq!(pack_luid(1, 2), (1i64 << 32) | 2);
        assert_eq!(pack_luid(0, u32::MAX), u32::MAX as i64);
    }
}
