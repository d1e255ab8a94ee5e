//! COM backend: apartment lifecycle and late-bound `IDispatch` access.
//!
//! [`ComRuntime`] implements [`Runtime`] over `CoInitializeEx` /
//! `CoUninitialize` and looks the application up in the Running Object
//! Table.  [`DispatchObject`] implements [`AutomationObject`] by resolving
//! member names with `GetIDsOfNames` and calling `Invoke`.

use std::iter;
use std::ptr;

use windows::core::{Interface, BSTR, GUID, IUnknown, PCWSTR, VARIANT};
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoFreeUnusedLibraries, CoInitializeEx, CoUninitialize, IDispatch,
    COINIT_APARTMENTTHREADED, DISPATCH_FLAGS, DISPATCH_METHOD, DISPATCH_PROPERTYGET,
    DISPATCH_PROPERTYPUT, DISPPARAMS,
};
use windows::Win32::System::Ole::{GetActiveObject, IEnumVARIANT};
use windows::Win32::System::Variant::{
    VariantChangeType, VAR_CHANGE_FLAGS, VT_BOOL, VT_BSTR, VT_CY, VT_DATE, VT_DECIMAL,
    VT_DISPATCH, VT_EMPTY, VT_I1, VT_I2, VT_I4, VT_I8, VT_INT, VT_NULL, VT_R4, VT_R8, VT_UI1,
    VT_UI2, VT_UI4, VT_UI8, VT_UINT, VT_UNKNOWN,
};

use crate::config::{EngineConfig, DEFAULT_PROG_ID};
use crate::errors::SolidEdgeError;
use crate::session::Runtime;
use crate::variant::{
    naive_to_oa_date, oa_date_to_naive, AutomationObject, Handle, NativeItems, Variant,
};

const LOCALE_USER_DEFAULT: u32 = 0x0400;
const DISPID_PROPERTYPUT: i32 = -3;
const DISPID_NEWENUM: i32 = -4;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(iter::once(0)).collect()
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Attaches to a running automation server by ProgID.
#[derive(Debug, Clone)]
pub struct ComRuntime {
    prog_id: String,
}

impl ComRuntime {
    pub fn new(prog_id: impl Into<String>) -> Self {
        Self {
            prog_id: prog_id.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.prog_id.clone())
    }

    pub fn prog_id(&self) -> &str {
        &self.prog_id
    }
}

impl Default for ComRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_PROG_ID)
    }
}

impl Runtime for ComRuntime {
    /// Initialise (or join) the thread's single-threaded apartment.
    ///
    /// `S_OK` and `S_FALSE` both require a balancing `CoUninitialize`;
    /// `RPC_E_CHANGED_MODE` (thread already joined the MTA) does not.
    fn initialize(&self) -> Result<bool, SolidEdgeError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };

        let hresult_value = hr.0 as u32;
        match hresult_value {
            0x0 | 0x1 => Ok(true),
            0x8001_0106 => {
                log::warn!(
                    "CoInitializeEx: RPC_E_CHANGED_MODE -- thread already has MTA apartment, \
                     using existing apartment instead of STA"
                );
                Ok(false)
            }
            _ => Err(SolidEdgeError::ComError(format!(
                "CoInitializeEx failed: HRESULT 0x{hresult_value:08X}"
            ))),
        }
    }

    fn attach(&self) -> Result<Handle, SolidEdgeError> {
        let prog_id = wide(&self.prog_id);
        let clsid = unsafe { CLSIDFromProgID(PCWSTR(prog_id.as_ptr())) }.map_err(|e| {
            SolidEdgeError::HostUnavailable(format!("{} is not registered: {e}", self.prog_id))
        })?;

        let mut unknown: Option<IUnknown> = None;
        unsafe { GetActiveObject(&clsid, None, &mut unknown) }.map_err(|e| {
            SolidEdgeError::HostUnavailable(format!("{} is not running: {e}", self.prog_id))
        })?;
        let unknown = unknown.ok_or_else(|| {
            SolidEdgeError::HostUnavailable(format!("{} returned no object", self.prog_id))
        })?;

        let dispatch: IDispatch = unknown.cast()?;
        Ok(Box::new(DispatchObject(dispatch)))
    }

    fn reclaim(&self) {
        unsafe { CoFreeUnusedLibraries() };
    }

    fn uninitialize(&self) {
        unsafe { CoUninitialize() };
    }
}

// ---------------------------------------------------------------------------
// IDispatch objects
// ---------------------------------------------------------------------------

/// One `IDispatch` reference.  Dropping it calls `Release`.
pub struct DispatchObject(IDispatch);

impl DispatchObject {
    fn dispid(&self, member: &str) -> Result<i32, SolidEdgeError> {
        let name = wide(member);
        let names = [PCWSTR(name.as_ptr())];
        let mut dispid = 0i32;
        unsafe {
            self.0.GetIDsOfNames(
                &GUID::zeroed(),
                names.as_ptr(),
                1,
                LOCALE_USER_DEFAULT,
                &mut dispid,
            )
        }
        .map_err(|e| SolidEdgeError::ComError(format!("unknown member {member}: {e}")))?;
        Ok(dispid)
    }

    fn invoke(
        &self,
        member: &str,
        dispid: i32,
        flags: DISPATCH_FLAGS,
        args: &[Variant],
        put: bool,
    ) -> Result<VARIANT, SolidEdgeError> {
        // IDispatch expects positional arguments in reverse order.
        let mut raw = args
            .iter()
            .rev()
            .map(to_native)
            .collect::<Result<Vec<_>, _>>()?;
        let mut named = DISPID_PROPERTYPUT;
        let params = DISPPARAMS {
            rgvarg: if raw.is_empty() {
                ptr::null_mut()
            } else {
                raw.as_mut_ptr()
            },
            rgdispidNamedArgs: if put { &mut named } else { ptr::null_mut() },
            cArgs: raw.len() as u32,
            cNamedArgs: u32::from(put),
        };

        let mut result = VARIANT::default();
        unsafe {
            self.0.Invoke(
                dispid,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                flags,
                &params,
                Some(&mut result),
                None,
                None,
            )
        }
        .map_err(|e| SolidEdgeError::ComError(format!("{member} failed: {e}")))?;
        Ok(result)
    }
}

impl AutomationObject for DispatchObject {
    fn get(&self, member: &str) -> Result<Variant, SolidEdgeError> {
        self.get_with(member, &[])
    }

    fn get_with(&self, member: &str, args: &[Variant]) -> Result<Variant, SolidEdgeError> {
        let dispid = self.dispid(member)?;
        let raw = self.invoke(
            member,
            dispid,
            DISPATCH_PROPERTYGET | DISPATCH_METHOD,
            args,
            false,
        )?;
        from_native(&raw)
    }

    fn put(&self, member: &str, value: Variant) -> Result<(), SolidEdgeError> {
        let dispid = self.dispid(member)?;
        self.invoke(member, dispid, DISPATCH_PROPERTYPUT, &[value], true)?;
        Ok(())
    }

    fn call(&self, member: &str, args: &[Variant]) -> Result<Variant, SolidEdgeError> {
        let dispid = self.dispid(member)?;
        let raw = self.invoke(member, dispid, DISPATCH_METHOD, args, false)?;
        from_native(&raw)
    }

    fn new_enum(&self) -> Result<Option<NativeItems<'_>>, SolidEdgeError> {
        let raw = match self.invoke(
            "_NewEnum",
            DISPID_NEWENUM,
            DISPATCH_PROPERTYGET | DISPATCH_METHOD,
            &[],
            false,
        ) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("no native enumerator: {e}");
                return Ok(None);
            }
        };
        let unknown = IUnknown::try_from(&raw)?;
        let inner: IEnumVARIANT = unknown.cast()?;
        Ok(Some(Box::new(EnumItems { inner, done: false })))
    }
}

/// `IEnumVARIANT` driven one element at a time.
struct EnumItems {
    inner: IEnumVARIANT,
    done: bool,
}

impl Iterator for EnumItems {
    type Item = Result<Variant, SolidEdgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut slot = [VARIANT::default()];
        let mut fetched = 0u32;
        let hr = unsafe { self.inner.Next(&mut slot, &mut fetched) };
        if hr.is_err() {
            self.done = true;
            return Some(Err(SolidEdgeError::ComError(format!(
                "IEnumVARIANT::Next failed: HRESULT 0x{:08X}",
                hr.0 as u32
            ))));
        }
        if fetched == 0 {
            self.done = true;
            return None;
        }
        let [value] = slot;
        Some(from_native(&value))
    }
}

// ---------------------------------------------------------------------------
// VARIANT conversion
// ---------------------------------------------------------------------------

const V_EMPTY: u16 = VT_EMPTY.0;
const V_NULL: u16 = VT_NULL.0;
const V_BOOL: u16 = VT_BOOL.0;
const V_BSTR: u16 = VT_BSTR.0;
const V_DATE: u16 = VT_DATE.0;
const V_DISPATCH: u16 = VT_DISPATCH.0;
const V_UNKNOWN: u16 = VT_UNKNOWN.0;
const V_I1: u16 = VT_I1.0;
const V_I2: u16 = VT_I2.0;
const V_I4: u16 = VT_I4.0;
const V_I8: u16 = VT_I8.0;
const V_INT: u16 = VT_INT.0;
const V_UI1: u16 = VT_UI1.0;
const V_UI2: u16 = VT_UI2.0;
const V_UI4: u16 = VT_UI4.0;
const V_UI8: u16 = VT_UI8.0;
const V_UINT: u16 = VT_UINT.0;
const V_R4: u16 = VT_R4.0;
const V_R8: u16 = VT_R8.0;
const V_CY: u16 = VT_CY.0;
const V_DECIMAL: u16 = VT_DECIMAL.0;

fn from_native(value: &VARIANT) -> Result<Variant, SolidEdgeError> {
    Ok(match value.vt() {
        V_EMPTY | V_NULL => Variant::Empty,
        V_BOOL => Variant::Bool(bool::try_from(value)?),
        V_BSTR => Variant::Text(BSTR::try_from(value)?.to_string()),
        V_I1 | V_I2 | V_I4 | V_I8 | V_INT | V_UI1 | V_UI2 | V_UI4 | V_UI8 | V_UINT => {
            Variant::Int(i64::try_from(value)?)
        }
        V_R4 | V_R8 | V_CY | V_DECIMAL => Variant::Float(f64::try_from(value)?),
        V_DATE => {
            let days = f64::try_from(value)?;
            oa_date_to_naive(days)
                .map(Variant::Date)
                .ok_or_else(|| SolidEdgeError::ComError(format!("date {days} out of range")))?
        }
        V_DISPATCH | V_UNKNOWN => {
            let dispatch: IDispatch = IUnknown::try_from(value)?.cast()?;
            Variant::Object(Box::new(DispatchObject(dispatch)))
        }
        other => {
            log::debug!("unsupported VARIANT type {other}, reading as text");
            BSTR::try_from(value)
                .map(|s| Variant::Text(s.to_string()))
                .unwrap_or(Variant::Empty)
        }
    })
}

fn to_native(value: &Variant) -> Result<VARIANT, SolidEdgeError> {
    Ok(match value {
        Variant::Empty => VARIANT::default(),
        Variant::Bool(b) => VARIANT::from(*b),
        Variant::Int(n) => match i32::try_from(*n) {
            Ok(n) => VARIANT::from(n),
            Err(_) => VARIANT::from(*n),
        },
        Variant::Float(x) => VARIANT::from(*x),
        Variant::Text(s) => VARIANT::from(BSTR::from(s.as_str())),
        Variant::Date(d) => {
            let days = VARIANT::from(naive_to_oa_date(*d));
            let mut date = VARIANT::default();
            unsafe { VariantChangeType(&mut date, &days, VAR_CHANGE_FLAGS(0), VT_DATE) }?;
            date
        }
        Variant::Object(_) => {
            return Err(SolidEdgeError::ComError(
                "object arguments are not supported".into(),
            ))
        }
    })
}
